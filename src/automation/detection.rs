//! Frame classification by masked per-pixel comparison.
//!
//! A reference image doubles as a mask: only its fully opaque pixels are
//! compared, so a full-window template can describe a small UI indicator
//! without any sub-image search. Reference and candidate must be captured
//! from the same rectangle.

use crate::automation::actions::Action;
use crate::capture::{Frame, ReferenceImage};

/// Returns true if every opaque reference pixel is within `margin` of the
/// candidate pixel at the same index, on each of the red, green and blue
/// channels.
///
/// Frames with different pixel counts never match. Reference pixels with
/// alpha below 255 are ignored whatever the candidate holds there.
pub fn matches(reference: &Frame, candidate: &Frame, margin: u8) -> bool {
    if reference.as_raw().len() != candidate.as_raw().len() {
        return false;
    }

    reference
        .pixels()
        .zip(candidate.pixels())
        .filter(|(expected, _)| expected[3] == 255)
        .all(|(expected, actual)| {
            // Captures from different sources can differ slightly in color
            expected[0].abs_diff(actual[0]) <= margin
                && expected[1].abs_diff(actual[1]) <= margin
                && expected[2].abs_diff(actual[2]) <= margin
        })
}

/// A reference image and the action it triggers.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub reference: ReferenceImage,
    pub action: Action,
}

/// Ordered set of triggers checked against each frame.
#[derive(Debug, Clone)]
pub struct Classifier {
    triggers: Vec<Trigger>,
    margin: u8,
}

impl Classifier {
    pub fn new(triggers: Vec<Trigger>, margin: u8) -> Self {
        Self { triggers, margin }
    }

    pub fn margin(&self) -> u8 {
        self.margin
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Returns the first trigger whose reference matches the frame.
    ///
    /// Triggers are checked in order and only the first match counts, so a
    /// frame matching several references still yields a single action.
    pub fn classify(&self, frame: &Frame) -> Option<&Trigger> {
        self.triggers
            .iter()
            .find(|trigger| matches(&trigger.reference.frame, frame, self.margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    /// Small deterministic generator so the fuzz-style tests stay reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next_u8(&mut self) -> u8 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 56) as u8
        }
    }

    fn opaque(width: u32, height: u32, seed: u64) -> Frame {
        let mut rng = Lcg(seed);
        ImageBuffer::from_fn(width, height, |_, _| {
            Rgba([rng.next_u8(), rng.next_u8(), rng.next_u8(), 255])
        })
    }

    /// Reference where only the top-left 2x2 block is opaque.
    fn masked_reference() -> Frame {
        ImageBuffer::from_fn(8, 6, |x, y| {
            if x < 2 && y < 2 {
                Rgba([200, 40, 40, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_size_mismatch_never_matches() {
        let reference = opaque(4, 4, 1);
        let larger: Frame = ImageBuffer::new(5, 4);
        let empty: Frame = ImageBuffer::new(0, 0);
        for margin in [0, 5, 255] {
            assert!(!matches(&reference, &larger, margin));
            assert!(!matches(&reference, &empty, margin));
        }
    }

    #[test]
    fn test_same_count_different_shape_compares_by_index() {
        let reference: Frame = ImageBuffer::from_pixel(2, 3, Rgba([9, 9, 9, 255]));
        let candidate: Frame = ImageBuffer::from_pixel(3, 2, Rgba([9, 9, 9, 255]));
        assert!(matches(&reference, &candidate, 0));
    }

    #[test]
    fn test_reflexive_at_zero_margin() {
        for seed in 0..16 {
            let reference = opaque(7, 5, seed);
            assert!(matches(&reference, &reference, 0));
        }
    }

    #[test]
    fn test_margin_boundary() {
        let reference: Frame = ImageBuffer::from_pixel(3, 3, Rgba([100, 100, 100, 255]));
        let mut candidate = reference.clone();
        candidate.put_pixel(1, 1, Rgba([105, 95, 100, 255]));

        assert!(matches(&reference, &candidate, 5));
        assert!(!matches(&reference, &candidate, 4));

        candidate.put_pixel(2, 2, Rgba([100, 100, 106, 0]));
        assert!(!matches(&reference, &candidate, 5));
    }

    #[test]
    fn test_margin_is_monotonic() {
        let reference = opaque(6, 6, 42);
        let mut rng = Lcg(7);
        let candidate: Frame = ImageBuffer::from_fn(6, 6, |x, y| {
            let base = reference.get_pixel(x, y);
            let jitter = rng.next_u8() % 12;
            Rgba([
                base[0].saturating_add(jitter),
                base[1].saturating_sub(jitter),
                base[2],
                255,
            ])
        });

        let first = (0..=255u8)
            .find(|&m| matches(&reference, &candidate, m))
            .expect("some margin must match");
        for margin in first..=255 {
            assert!(matches(&reference, &candidate, margin));
        }
        for margin in 0..first {
            assert!(!matches(&reference, &candidate, margin));
        }
    }

    #[test]
    fn test_transparent_pixels_are_ignored() {
        let reference = masked_reference();
        let mut rng = Lcg(99);

        for _ in 0..32 {
            let candidate: Frame = ImageBuffer::from_fn(8, 6, |x, y| {
                if x < 2 && y < 2 {
                    Rgba([200, 40, 40, 255])
                } else {
                    Rgba([rng.next_u8(), rng.next_u8(), rng.next_u8(), rng.next_u8()])
                }
            });
            assert!(matches(&reference, &candidate, 0));
        }
    }

    #[test]
    fn test_semi_transparent_pixels_are_ignored() {
        let reference: Frame = ImageBuffer::from_pixel(2, 2, Rgba([255, 255, 255, 254]));
        let candidate: Frame = ImageBuffer::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        assert!(matches(&reference, &candidate, 0));
    }

    #[test]
    fn test_opaque_pixel_violation() {
        let reference = masked_reference();
        let mut candidate = reference.clone();
        candidate.put_pixel(1, 1, Rgba([200, 40, 46, 255]));
        assert!(!matches(&reference, &candidate, 5));
        assert!(matches(&reference, &candidate, 6));
    }

    fn trigger(name: &str, frame: Frame, action: Action) -> Trigger {
        Trigger {
            reference: ReferenceImage::new(name, frame),
            action,
        }
    }

    #[test]
    fn test_classify_first_match_wins() {
        let attack: Frame = ImageBuffer::from_pixel(4, 4, Rgba([10, 10, 10, 255]));
        // Fully transparent reference matches any frame of the same size
        let defend: Frame = ImageBuffer::new(4, 4);
        let classifier = Classifier::new(
            vec![
                trigger("attack", attack.clone(), Action::Attack),
                trigger("defend", defend, Action::Heal),
            ],
            5,
        );

        let hit = classifier.classify(&attack).unwrap();
        assert_eq!(hit.action, Action::Attack);
        assert_eq!(hit.reference.name, "attack");

        let other: Frame = ImageBuffer::from_pixel(4, 4, Rgba([200, 10, 10, 255]));
        assert_eq!(classifier.classify(&other).unwrap().action, Action::Heal);
    }

    #[test]
    fn test_classify_no_match() {
        let attack: Frame = ImageBuffer::from_pixel(4, 4, Rgba([10, 10, 10, 255]));
        let classifier = Classifier::new(vec![trigger("attack", attack, Action::Attack)], 5);

        let black: Frame = ImageBuffer::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        assert!(classifier.classify(&black).is_none());
        assert!(classifier.classify(&ImageBuffer::new(0, 0)).is_none());
    }
}
