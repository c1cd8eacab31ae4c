use crate::model::{Event, Side};
use crate::resolve::SideResolver;
use crate::snapshot::{OddsIndex, rows_at, select_snapshot};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestPrices {
    pub home: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoVig {
    pub home: f64,
    pub away: f64,
}

/// Smallest decimal price quoted per side across every source in the snapshot.
pub fn best_prices(quotes: impl IntoIterator<Item = (Side, f64)>) -> Option<BestPrices> {
    let mut home: Option<f64> = None;
    let mut away: Option<f64> = None;
    for (side, price) in quotes {
        let slot = match side {
            Side::Home => &mut home,
            Side::Away => &mut away,
        };
        *slot = Some(slot.map_or(price, |cur| cur.min(price)));
    }
    Some(BestPrices {
        home: home?,
        away: away?,
    })
}

pub fn no_vig_from_decimal(home: f64, away: f64) -> Option<NoVig> {
    if home <= 1.0 || away <= 1.0 {
        return None;
    }
    let ih = 1.0 / home;
    let ia = 1.0 / away;
    let sum = ih + ia;
    if sum <= 0.0 {
        return None;
    }
    Some(NoVig {
        home: ih / sum,
        away: ia / sum,
    })
}

/// De-vigged home-win probability for one event, using the snapshot chosen
/// against its commence time. `None` at the first stage that cannot proceed.
pub fn no_vig_home_probability(index: &OddsIndex<'_>, event: &Event) -> Option<f64> {
    let rows = index.rows_for(&event.id);
    let snapshot = select_snapshot(rows.iter().copied(), event.commence_time)?;
    let resolver = SideResolver::new(&event.home_name, &event.away_name);
    let quotes = rows_at(rows, snapshot)
        .filter_map(|row| resolver.resolve(row).map(|side| (side, row.price)));
    let best = best_prices(quotes)?;
    no_vig_from_decimal(best.home, best.away).map(|p| p.home)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{best_prices, no_vig_from_decimal, no_vig_home_probability};
    use crate::model::{Event, OddsRow, Side};
    use crate::snapshot::OddsIndex;

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 14, 0, 0).unwrap()
    }

    fn event() -> Event {
        Event {
            id: "e1".to_string(),
            sport_key: "tennis_atp_wimbledon".to_string(),
            commence_time: kickoff(),
            home_name: "Home Player".to_string(),
            away_name: "Away Player".to_string(),
        }
    }

    fn quote(key: Option<&str>, name: Option<&str>, price: f64, at: DateTime<Utc>) -> OddsRow {
        OddsRow {
            event_id: "e1".to_string(),
            outcome_key: key.map(str::to_string),
            outcome_name: name.map(str::to_string),
            price,
            snapshot_time: at,
        }
    }

    #[test]
    fn no_vig_probs_sum_to_one() {
        for (h, a) in [(1.01, 30.0), (1.8, 2.2), (2.0, 2.0), (15.0, 1.05), (1.5, 1.5)] {
            let p = no_vig_from_decimal(h, a).expect("valid");
            assert!(p.home > 0.0 && p.home < 1.0);
            assert!((p.home + p.away - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn prices_at_or_below_one_are_rejected() {
        assert!(no_vig_from_decimal(1.0, 2.0).is_none());
        assert!(no_vig_from_decimal(2.0, 0.5).is_none());
        assert!(no_vig_from_decimal(-3.0, 2.0).is_none());
    }

    #[test]
    fn best_price_is_the_minimum_per_side() {
        let best = best_prices([
            (Side::Home, 1.90),
            (Side::Away, 2.10),
            (Side::Home, 1.80),
            (Side::Away, 2.25),
        ])
        .expect("both sides");
        assert_eq!(best.home, 1.80);
        assert_eq!(best.away, 2.10);
    }

    #[test]
    fn one_sided_quotes_have_no_best_prices() {
        assert!(best_prices([(Side::Home, 1.5), (Side::Home, 1.6)]).is_none());
    }

    #[test]
    fn extracts_probability_from_mixed_labels() {
        let before = kickoff() - Duration::hours(1);
        let after = kickoff() + Duration::hours(1);
        let rows = vec![
            quote(Some("home"), None, 1.90, before),
            quote(None, Some("HOME PLAYER"), 1.80, before),
            quote(Some("Away Player"), Some("away player"), 2.20, before),
            // Post-kickoff movement must not leak in.
            quote(Some("home"), None, 1.10, after),
            quote(Some("away"), None, 8.00, after),
        ];
        let index = OddsIndex::new(&rows);
        let p = no_vig_home_probability(&index, &event()).expect("probability");
        assert!((p - 0.55).abs() < 1e-9, "got {p}");
    }

    #[test]
    fn sentinel_price_poisons_the_whole_snapshot() {
        let at = kickoff() - Duration::hours(1);
        let rows = vec![
            quote(Some("home"), None, 1.80, at),
            quote(Some("home"), None, 1.0, at),
            quote(Some("away"), None, 2.20, at),
        ];
        let index = OddsIndex::new(&rows);
        assert!(no_vig_home_probability(&index, &event()).is_none());
    }

    #[test]
    fn missing_away_side_yields_nothing() {
        let at = kickoff() - Duration::hours(1);
        let rows = vec![
            quote(Some("home"), None, 1.80, at),
            quote(None, Some("Somebody Else"), 2.20, at),
        ];
        let index = OddsIndex::new(&rows);
        assert!(no_vig_home_probability(&index, &event()).is_none());
    }
}
