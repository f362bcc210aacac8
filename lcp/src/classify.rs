use log::debug;

use crate::consts::{LCP_MAX_CLASSES, LCP_NO_DATA};
use crate::raster::RasterSource;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandClasses {
    /// Distinct valid values, or `-1` when there were more than fit.
    pub num_classes: i32,
    /// A leading `0` then the distinct values ascending. Empty when
    /// `num_classes` is `-1`.
    pub values: Vec<i32>,
}

impl BandClasses {
    pub fn not_enumerated() -> Self {
        Self {
            num_classes: -1,
            values: Vec::new(),
        }
    }

    pub fn is_enumerated(&self) -> bool {
        self.num_classes >= 0
    }
}

/// Tracks the distinct values of an `i16` band in a 65536 bit set.
#[derive(Debug, Clone)]
pub struct BandClassifier {
    seen: Vec<u64>,
    count: usize,
    too_many: bool,
}

impl Default for BandClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BandClassifier {
    pub fn new() -> Self {
        Self {
            seen: vec![0; (1 << 16) / 64],
            count: 0,
            too_many: false,
        }
    }

    /// Marks every valid value in `row`. Returns `false` once a value past
    /// the class limit shows up; further rows are not needed.
    pub fn push_row(&mut self, row: &[i16]) -> bool {
        if self.too_many {
            return false;
        }
        for value in row.iter().copied().filter(|value| *value != LCP_NO_DATA) {
            let index = (i32::from(value) + 32768) as usize;
            let (word, bit) = (index / 64, 1_u64 << (index % 64));
            if self.seen[word] & bit != 0 {
                continue;
            }
            if self.count == LCP_MAX_CLASSES {
                self.too_many = true;
                return false;
            }
            self.seen[word] |= bit;
            self.count += 1;
        }
        true
    }

    pub fn finish(&self) -> BandClasses {
        if self.too_many {
            return BandClasses::not_enumerated();
        }
        let mut values = Vec::with_capacity(self.count + 1);
        values.push(0);
        for (word_index, word) in self.seen.iter().enumerate() {
            let mut bits = *word;
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                values.push((word_index * 64 + bit) as i32 - 32768);
                bits &= bits - 1;
            }
        }
        BandClasses {
            num_classes: self.count as i32,
            values,
        }
    }
}

pub fn classify_band<S: RasterSource + ?Sized>(source: &S, band: usize) -> Result<BandClasses> {
    let mut classifier = BandClassifier::new();
    let mut row = vec![0_i16; source.width()];
    for y in 0..source.height() {
        source.read_row(band, y, &mut row)?;
        if !classifier.push_row(&row) {
            debug!("Band {band} has more than {LCP_MAX_CLASSES} classes, stopped at row {y}.");
            break;
        }
    }
    Ok(classifier.finish())
}

pub fn classify_rows<R: AsRef<[i16]>>(rows: &[R]) -> BandClasses {
    let mut classifier = BandClassifier::new();
    for row in rows {
        if !classifier.push_row(row.as_ref()) {
            break;
        }
    }
    classifier.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::InMemoryRaster;

    #[test]
    fn values_are_sorted_after_leading_zero() {
        let classes = classify_rows(&[vec![91, 1, LCP_NO_DATA], vec![-5, 91, 98]]);
        assert_eq!(classes.num_classes, 4);
        assert_eq!(classes.values, vec![0, -5, 1, 91, 98]);
    }

    #[test]
    fn ninety_nine_values_fit() {
        let row: Vec<i16> = (1..=99).collect();
        let classes = classify_rows(&[row]);
        assert_eq!(classes.num_classes, 99);
        assert_eq!(classes.values.len(), 100);
        assert_eq!(classes.values[0], 0);
        assert_eq!(classes.values[99], 99);
    }

    #[test]
    fn hundredth_value_is_too_many() {
        let row: Vec<i16> = (1..=100).collect();
        assert_eq!(classify_rows(&[row]), BandClasses::not_enumerated());

        let row: Vec<i16> = (0..150).collect();
        let classes = classify_rows(&[row]);
        assert_eq!(classes.num_classes, -1);
        assert!(classes.values.is_empty());
        assert!(!classes.is_enumerated());
    }

    #[test]
    fn repeated_values_count_once() {
        let rows = vec![vec![7_i16; 500]; 20];
        let classes = classify_rows(&rows);
        assert_eq!(classes.num_classes, 1);
        assert_eq!(classes.values, vec![0, 7]);
    }

    #[test]
    fn nodata_only_band_has_no_classes() {
        let classes = classify_rows(&[vec![LCP_NO_DATA; 4]]);
        assert_eq!(classes.num_classes, 0);
        assert_eq!(classes.values, vec![0]);
    }

    #[test]
    fn extremes_of_the_value_range() {
        let classes = classify_rows(&[vec![i16::MIN, i16::MAX, 0]]);
        assert_eq!(classes.values, vec![0, -32768, 0, 32767]);
    }

    #[test]
    fn classify_band_reads_source_rows() {
        let raster = InMemoryRaster::from_fn(15, 10, 2, |band, x, y| {
            if band == 1 {
                (x % 3) as i16
            } else {
                (y * 15 + x) as i16
            }
        })
        .expect("raster");
        let first = classify_band(&raster, 1).expect("classify band 1");
        assert_eq!(first.values, vec![0, 0, 1, 2]);
        let second = classify_band(&raster, 2).expect("classify band 2");
        assert_eq!(second.num_classes, -1);
    }
}
