use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stdev: f64,
}

/// Column-oriented chart data, oldest slot first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartView {
    pub labels: Vec<String>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub mean: Vec<f64>,
    pub stdev: Vec<f64>,
}

/// Fixed-length ring of chart points.
///
/// The buffer always holds exactly `len` slots (empty slots carry a blank label and zeroes).
/// `cursor` is the next slot to be written, which is also the oldest one.
#[derive(Debug, Clone)]
pub struct ChartBuffer {
    labels: Vec<String>,
    min: Vec<f64>,
    max: Vec<f64>,
    mean: Vec<f64>,
    stdev: Vec<f64>,
    cursor: usize,
}

impl ChartBuffer {
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidChartLength);
        }

        Ok(Self {
            labels: vec![String::new(); len],
            min: vec![0.0; len],
            max: vec![0.0; len],
            mean: vec![0.0; len],
            stdev: vec![0.0; len],
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn push(&mut self, point: ChartPoint) {
        let i = self.cursor;
        self.labels[i] = point.label;
        self.min[i] = point.min;
        self.max[i] = point.max;
        self.mean[i] = point.mean;
        self.stdev[i] = point.stdev;
        self.cursor = (i + 1) % self.len();
    }

    /// Slot indices in chronological order.
    fn chronological(&self) -> impl Iterator<Item = usize> + '_ {
        let len = self.len();
        (0..len).map(move |offset| (self.cursor + offset) % len)
    }

    pub fn points(&self) -> Vec<ChartPoint> {
        self.chronological()
            .map(|i| ChartPoint {
                label: self.labels[i].clone(),
                min: self.min[i],
                max: self.max[i],
                mean: self.mean[i],
                stdev: self.stdev[i],
            })
            .collect()
    }

    pub fn view(&self) -> ChartView {
        let mut view = ChartView {
            labels: Vec::with_capacity(self.len()),
            min: Vec::with_capacity(self.len()),
            max: Vec::with_capacity(self.len()),
            mean: Vec::with_capacity(self.len()),
            stdev: Vec::with_capacity(self.len()),
        };

        for i in self.chronological() {
            view.labels.push(self.labels[i].clone());
            view.min.push(self.min[i]);
            view.max.push(self.max[i]);
            view.mean.push(self.mean[i]);
            view.stdev.push(self.stdev[i]);
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(n: u32) -> ChartPoint {
        ChartPoint {
            label: format!("{n}s"),
            min: f64::from(n),
            max: f64::from(n) * 2.0,
            mean: f64::from(n) * 1.5,
            stdev: 0.5,
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        assert!(matches!(ChartBuffer::new(0), Err(Error::InvalidChartLength)));
    }

    #[test]
    fn always_has_fixed_number_of_slots() {
        let mut buf = ChartBuffer::new(3).unwrap_or_else(|err| panic!("chart: {err}"));
        assert_eq!(buf.points().len(), 3);

        buf.push(point(1));
        assert_eq!(buf.view().labels, vec!["", "", "1s"]);

        for n in 2..=10 {
            buf.push(point(n));
            assert_eq!(buf.points().len(), 3);
        }
    }

    #[test]
    fn reads_start_after_write_cursor() {
        let mut buf = ChartBuffer::new(4).unwrap_or_else(|err| panic!("chart: {err}"));
        for n in 1..=6 {
            buf.push(point(n));
        }

        // Raw order is [5, 6, 3, 4]; display order must be oldest first.
        assert_eq!(buf.cursor(), 2);
        let view = buf.view();
        assert_eq!(view.labels, vec!["3s", "4s", "5s", "6s"]);
        assert_eq!(view.min, vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(view.max, vec![6.0, 8.0, 10.0, 12.0]);

        let points = buf.points();
        assert_eq!(points.first(), Some(&point(3)));
        assert_eq!(points.last(), Some(&point(6)));
    }
}
