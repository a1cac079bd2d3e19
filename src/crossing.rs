//! Where does a sampled curve first cross a threshold? Used to mark
//! the workload at which the frame rate drops below the target.

use itertools::Itertools;

use crate::{
    aggregate::UnifiedTable,
    debug,
    record::{Dimension, GroupKey, NumericField, RunRecord},
};

/// The first `x` past `lower_bound` at which the piecewise linear
/// curve through `points` (sorted by x) crosses `threshold`.
///
/// Consecutive pairs where either x is below `lower_bound` are
/// skipped. Only strict sign changes of `y - threshold` count: a
/// sample lying exactly on the threshold does not make its pairs
/// crossings. Later crossings are not reported.
pub fn first_crossing(points: &[(f64, f64)], threshold: f64, lower_bound: f64) -> Option<f64> {
    points
        .iter()
        .tuple_windows()
        .find_map(|(&(x0, y0), &(x1, y1))| {
            if x0 < lower_bound || x1 < lower_bound {
                return None;
            }
            if (y0 - threshold) * (y1 - threshold) < 0. {
                Some(x0 + (threshold - y0) * (x1 - x0) / (y1 - y0))
            } else {
                None
            }
        })
}

/// The samples of one group, sorted ascending by x.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub key: GroupKey,
    pub points: Vec<(f64, f64)>,
}

impl Curve {
    /// Records lacking either value are left out. Samples with equal x
    /// keep their table order.
    pub fn from_records<'r>(
        key: GroupKey,
        records: impl IntoIterator<Item = &'r RunRecord>,
        x: NumericField,
        y: NumericField,
    ) -> Self {
        let mut points: Vec<(f64, f64)> = records
            .into_iter()
            .filter_map(|r| Some((r.get(x)?, r.get(y)?)))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Curve { key, points }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossingEvent {
    pub key: GroupKey,
    /// None if the curve never crosses the threshold past the lower
    /// bound (or has no samples there)
    pub crossing: Option<f64>,
}

/// Parameters of the crossing search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingAnalysis {
    pub x: NumericField,
    pub y: NumericField,
    pub threshold: f64,
    pub lower_bound: f64,
}

impl Default for CrossingAnalysis {
    fn default() -> Self {
        Self {
            x: NumericField::Bunnies,
            y: NumericField::FpsGame,
            threshold: 60.,
            lower_bound: 1500.,
        }
    }
}

impl CrossingAnalysis {
    pub fn curves(&self, table: &UnifiedTable, dimensions: &[Dimension]) -> Vec<Curve> {
        table
            .group_by(dimensions)
            .into_iter()
            .map(|(key, records)| Curve::from_records(key, records, self.x, self.y))
            .collect()
    }

    pub fn crossing(&self, curve: &Curve) -> Option<f64> {
        first_crossing(&curve.points, self.threshold, self.lower_bound)
    }

    /// One event per group, in group key order.
    pub fn events(&self, table: &UnifiedTable, dimensions: &[Dimension]) -> Vec<CrossingEvent> {
        self.curves(table, dimensions)
            .into_iter()
            .map(|curve| {
                let crossing = self.crossing(&curve);
                debug!(
                    "{}: {} samples, crossing {crossing:?}",
                    curve.key,
                    curve.points.len()
                );
                CrossingEvent {
                    key: curve.key,
                    crossing,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use kstring::KString;

    use super::*;

    fn points(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
        xs.iter().copied().zip(ys.iter().copied()).collect()
    }

    #[test]
    fn t_interpolation() {
        let p = points(&[1000., 1500., 1600., 1700.], &[70., 65., 58., 50.]);
        let x = first_crossing(&p, 60., 1500.).expect("crosses");
        assert_relative_eq!(x, 1500. + (60. - 65.) * (1600. - 1500.) / (58. - 65.));
        assert_relative_eq!(x, 1571.4285714285713, epsilon = 1e-9);
    }

    #[test]
    fn t_pairs_below_lower_bound_are_skipped() {
        // The crossing between 1000 and 1400 is before the bound
        let p = points(&[1000., 1400., 1600.], &[70., 50., 40.]);
        assert_eq!(first_crossing(&p, 60., 1500.), None);
        // A pair straddling the bound is skipped, too
        let p = points(&[1400., 1600., 1700.], &[70., 50., 40.]);
        assert_eq!(first_crossing(&p, 60., 1500.), None);
    }

    #[test]
    fn t_never_crossing() {
        let p = points(&[1500., 2000., 2500.], &[90., 75., 61.]);
        assert_eq!(first_crossing(&p, 60., 1500.), None);
        assert_eq!(first_crossing(&[], 60., 1500.), None);
        assert_eq!(first_crossing(&[(1600., 30.)], 60., 1500.), None);
    }

    #[test]
    fn t_exact_threshold_is_not_a_crossing() {
        let p = points(&[1500., 1600., 1700.], &[60., 55., 62.]);
        // (60, 55) has product 0; the next strict sign change wins
        let x = first_crossing(&p, 60., 1500.).expect("crosses");
        assert_relative_eq!(x, 1600. + (60. - 55.) * 100. / 7.);

        let p = points(&[1500., 1600., 1700.], &[65., 60., 55.]);
        assert_eq!(first_crossing(&p, 60., 1500.), None);
    }

    #[test]
    fn t_first_crossing_wins() {
        let p = points(&[1500., 1600., 1700., 1800.], &[70., 50., 70., 50.]);
        let x = first_crossing(&p, 60., 1500.).expect("crosses");
        assert_relative_eq!(x, 1550.);
    }

    #[test]
    fn t_upward_crossing() {
        let p = points(&[1500., 1600.], &[50., 70.]);
        assert_relative_eq!(first_crossing(&p, 60., 1500.).unwrap(), 1550.);
    }

    fn rec(lang: &'static str, bunnies: f64, fps: Option<f64>) -> RunRecord {
        let mut r = RunRecord::new(0, Some(lang.into()), Some("Firefox".into()))
            .with(NumericField::Bunnies, bunnies);
        r.set(NumericField::FpsGame, fps);
        r
    }

    #[test]
    fn t_events_per_group() {
        let table = UnifiedTable::from_records([
            rec("Rust", 1700., Some(50.)),
            rec("Go", 1500., Some(80.)),
            rec("Rust", 1500., Some(65.)),
            rec("Rust", 1600., Some(58.)),
            rec("Go", 1600., None),
            rec("Go", 2000., Some(70.)),
            rec("Rust", 1000., Some(70.)),
        ]);
        let analysis = CrossingAnalysis::default();
        let dims = [Dimension::Lang, Dimension::Browser];

        let curves = analysis.curves(&table, &dims);
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].points, [(1500., 80.), (2000., 70.)]);
        assert_eq!(
            curves[1].points,
            [(1000., 70.), (1500., 65.), (1600., 58.), (1700., 50.)]
        );

        let events = analysis.events(&table, &dims);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].key.values(),
            [KString::from_static("Go"), KString::from_static("Firefox")]
        );
        assert_eq!(events[0].crossing, None);
        assert_relative_eq!(events[1].crossing.unwrap(), 1571.4285714285713, epsilon = 1e-9);

        // Deterministic on re-run
        assert_eq!(events, analysis.events(&table, &dims));
    }
}
