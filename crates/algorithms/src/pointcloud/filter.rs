//! Point filters
//!
//! Filters decide per point whether it takes part in the interpolation.
//! Malformed parameters are rejected when a filter is built, never while
//! points are being tested.

use lidem_core::geo::{parse_doubles, GeoCoordinate, GeoDims};
use lidem_core::{Area, Error, ReferenceSystem, Result};
use std::collections::BTreeSet;

use super::PointRecord;

/// A per-point keep/reject decision
pub trait PointFilter: Send + Sync {
    fn keep(&self, point: &PointRecord) -> bool;

    /// Human readable summary, for logs
    fn describe(&self) -> String;
}

/// Keeps points inside a rectangle, bounds included
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFilter {
    window: Area,
}

impl WindowFilter {
    pub fn new(window: Area) -> Self {
        Self { window }
    }

    /// Build from `ulx,uly,width,height`
    pub fn from_params(params: &str) -> Result<Self> {
        let values = parse_doubles(params, "keep_window")?;
        if values.len() != 4 {
            return Err(Error::invalid_parameter(
                "keep_window",
                params,
                format!("needs 4 values (ulx,uly,width,height), got {}", values.len()),
            ));
        }
        if values[2] < 0.0 || values[3] < 0.0 {
            return Err(Error::invalid_parameter(
                "keep_window",
                params,
                "width and height must not be negative",
            ));
        }
        Ok(Self::new(Area::new(
            GeoCoordinate::new(values[0], values[1]),
            GeoDims::new(values[2], values[3]),
            ReferenceSystem::not_defined(),
        )))
    }

    pub fn window(&self) -> &Area {
        &self.window
    }
}

impl PointFilter for WindowFilter {
    fn keep(&self, p: &PointRecord) -> bool {
        !(p.x < self.window.left()
            || p.x > self.window.right()
            || p.y < self.window.bottom()
            || p.y > self.window.top())
    }

    fn describe(&self) -> String {
        format!(
            "keep_window [{:.6}:{:.6}] x [{:.6}:{:.6}]",
            self.window.left(),
            self.window.right(),
            self.window.bottom(),
            self.window.top()
        )
    }
}

/// Keeps points whose classification is in a fixed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFilter {
    classes: BTreeSet<u8>,
}

impl ClassFilter {
    pub fn new(classes: impl IntoIterator<Item = u8>) -> Self {
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Build from a comma separated list of class codes
    pub fn from_params(params: &str) -> Result<Self> {
        let classes = params
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u8>().map_err(|_| {
                    Error::invalid_parameter(
                        "keep_classes",
                        params,
                        format!("'{}' is not a classification code (0-255)", s),
                    )
                })
            })
            .collect::<Result<BTreeSet<u8>>>()?;
        if classes.is_empty() {
            return Err(Error::invalid_parameter(
                "keep_classes",
                params,
                "at least one class is needed",
            ));
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> impl Iterator<Item = u8> + '_ {
        self.classes.iter().copied()
    }
}

impl PointFilter for ClassFilter {
    fn keep(&self, p: &PointRecord) -> bool {
        self.classes.contains(&p.classification)
    }

    fn describe(&self) -> String {
        let list: Vec<String> = self.classes.iter().map(|c| c.to_string()).collect();
        format!("keep_classes({})", list.join(","))
    }
}

/// Logical AND of filters, evaluated in insertion order
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn PointFilter>>,
    window: Option<Area>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter by name: `keep_window` or `keep_classes`
    pub fn add_named(&mut self, name: &str, params: &str) -> Result<()> {
        match name {
            "keep_window" => self.add_window(WindowFilter::from_params(params)?),
            "keep_classes" => self.add(ClassFilter::from_params(params)?),
            other => return Err(Error::UnknownFilter(other.to_string())),
        }
        Ok(())
    }

    /// Add a window filter; the first one is also used for source rejection
    pub fn add_window(&mut self, filter: WindowFilter) {
        if self.window.is_none() {
            self.window = Some(filter.window().clone());
        }
        self.add(filter);
    }

    pub fn add<F: PointFilter + 'static>(&mut self, filter: F) {
        self.filters.push(Box::new(filter));
    }

    /// Window a source must overlap to be read at all
    pub fn window(&self) -> Option<&Area> {
        self.window.as_ref()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// True when every filter keeps the point
    pub fn keep(&self, point: &PointRecord) -> bool {
        self.filters.iter().all(|f| f.keep(point))
    }

    pub fn describe(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.describe()).collect()
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn pt(x: f64, y: f64, class: u8) -> PointRecord {
        PointRecord::new(x, y, 0.0, class)
    }

    #[test]
    fn test_window_filter() {
        // (0,0)-(10,10)
        let f = WindowFilter::from_params("0,10,10,10").unwrap();
        assert!(f.keep(&pt(5.0, 5.0, 0)));
        assert!(!f.keep(&pt(15.0, 5.0, 0)));
        // bounds are inclusive
        assert!(f.keep(&pt(0.0, 0.0, 0)));
        assert!(f.keep(&pt(10.0, 10.0, 0)));
        assert!(!f.keep(&pt(5.0, -0.001, 0)));
    }

    #[test]
    fn test_window_filter_params() {
        assert!(WindowFilter::from_params("0,10,10").is_err());
        assert!(WindowFilter::from_params("0,10,10,10,5").is_err());
        assert!(WindowFilter::from_params("0,ten,10,10").is_err());
        assert!(WindowFilter::from_params("0,10,-1,10").is_err());
        let f = WindowFilter::from_params(" 1.5, 20 ,3,4").unwrap();
        assert_eq!(f.describe(), "keep_window [1.500000:4.500000] x [16.000000:20.000000]");
    }

    #[test]
    fn test_class_filter() {
        let f = ClassFilter::from_params("2,6").unwrap();
        assert!(f.keep(&pt(0.0, 0.0, 6)));
        assert!(!f.keep(&pt(0.0, 0.0, 3)));
        assert_eq!(f.describe(), "keep_classes(2,6)");

        assert!(ClassFilter::from_params("").is_err());
        assert!(ClassFilter::from_params("2,x").is_err());
        assert!(ClassFilter::from_params("256").is_err());
    }

    #[test]
    fn test_pipeline_is_conjunction() {
        let mut p = FilterPipeline::new();
        assert!(p.keep(&pt(100.0, 100.0, 9)));
        p.add_named("keep_window", "0,10,10,10").unwrap();
        p.add_named("keep_classes", "2").unwrap();
        assert_eq!(p.len(), 2);
        assert!(p.keep(&pt(5.0, 5.0, 2)));
        assert!(!p.keep(&pt(5.0, 5.0, 3)));
        assert!(!p.keep(&pt(50.0, 5.0, 2)));
        assert_eq!(p.window().map(|w| w.right()), Some(10.0));
    }

    /// Keeps points of one class and counts every call
    struct Counting {
        class: u8,
        calls: Arc<AtomicUsize>,
    }

    impl PointFilter for Counting {
        fn keep(&self, p: &PointRecord) -> bool {
            self.calls.fetch_add(1, Ordering::Relaxed);
            p.classification == self.class
        }

        fn describe(&self) -> String {
            format!("counting({})", self.class)
        }
    }

    #[test]
    fn test_pipeline_stops_at_first_rejection() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut p = FilterPipeline::new();
        p.add(Counting {
            class: 2,
            calls: first.clone(),
        });
        p.add(Counting {
            class: 2,
            calls: second.clone(),
        });

        assert!(!p.keep(&pt(0.0, 0.0, 5)));
        assert_eq!(first.load(Ordering::Relaxed), 1);
        assert_eq!(second.load(Ordering::Relaxed), 0);

        assert!(p.keep(&pt(0.0, 0.0, 2)));
        assert_eq!(first.load(Ordering::Relaxed), 2);
        assert_eq!(second.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unknown_filter() {
        let mut p = FilterPipeline::new();
        let err = p.add_named("keep_returns", "1").unwrap_err();
        assert!(matches!(err, Error::UnknownFilter(ref n) if n == "keep_returns"));
        assert!(p.is_empty());
    }
}
