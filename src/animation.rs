//! Declarative animation descriptions.
//!
//! Each `Animation` is independent: the renderer turns it into a SMIL
//! `<animate>` element and nothing coordinates them afterwards.

use crate::config::AnimationConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    EaseOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    Forever,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// SVG attribute being animated, e.g. `opacity` or `r`.
    pub property: &'static str,
    pub from: f64,
    pub to: f64,
    pub duration: f64,
    pub delay: f64,
    pub easing: Easing,
    pub repeat: Repeat,
}

impl Animation {
    pub fn new(property: &'static str, from: f64, to: f64, duration: f64) -> Self {
        Self {
            property,
            from,
            to,
            duration,
            delay: 0.0,
            easing: Easing::Linear,
            repeat: Repeat::Once,
        }
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn ease_out(mut self) -> Self {
        self.easing = Easing::EaseOut;
        self
    }

    pub fn forever(mut self) -> Self {
        self.repeat = Repeat::Forever;
        self
    }

    /// Renders as a SMIL `<animate>` element.
    pub fn to_smil(&self) -> String {
        let mut out = format!(
            r#"<animate attributeName="{}" from="{}" to="{}" dur="{}s" begin="{}s""#,
            self.property,
            fmt_num(self.from),
            fmt_num(self.to),
            fmt_num(self.duration),
            fmt_num(self.delay),
        );
        match self.easing {
            Easing::Linear => {}
            // CSS "ease-out" control points
            Easing::EaseOut => {
                out.push_str(r#" calcMode="spline" keyTimes="0;1" keySplines="0 0 0.58 1""#)
            }
        }
        match self.repeat {
            Repeat::Once => out.push_str(r#" fill="freeze"/>"#),
            Repeat::Forever => out.push_str(r#" repeatCount="indefinite"/>"#),
        }
        out
    }
}

/// Per-marker pulse start offsets in `[0, max_pulse_delay)`.
///
/// Seeded so a given config always renders the same SVG.
pub fn pulse_delays(config: &AnimationConfig, count: usize) -> Vec<f64> {
    if !config.max_pulse_delay.is_finite() || config.max_pulse_delay <= 0.0 {
        return vec![0.0; count];
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    (0..count)
        .map(|_| rng.gen_range(0.0..config.max_pulse_delay))
        .collect()
}

/// Formats with at most two decimals and no trailing zeros.
pub fn fmt_num(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(fmt_num(640.0), "640");
        assert_eq!(fmt_num(1.2), "1.2");
        assert_eq!(fmt_num(0.456), "0.46");
        assert_eq!(fmt_num(-0.001), "0");
        assert_eq!(fmt_num(-3.5), "-3.5");
    }

    #[test]
    fn one_shot_animation_freezes() {
        let smil = Animation::new("opacity", 0.0, 1.0, 1.2).delay(0.06).to_smil();
        assert_eq!(
            smil,
            r#"<animate attributeName="opacity" from="0" to="1" dur="1.2s" begin="0.06s" fill="freeze"/>"#
        );
    }

    #[test]
    fn repeating_animation_loops() {
        let smil = Animation::new("r", 6.0, 15.0, 2.0).ease_out().forever().to_smil();
        assert!(smil.contains(r#"repeatCount="indefinite""#));
        assert!(smil.contains(r#"calcMode="spline""#));
        assert!(!smil.contains("freeze"));
    }

    #[test]
    fn pulse_delays_are_seeded_and_bounded() {
        let config = AnimationConfig { seed: 42, max_pulse_delay: 1.5 };
        let a = pulse_delays(&config, 16);
        let b = pulse_delays(&config, 16);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.iter().all(|d| (0.0..1.5).contains(d)));
    }

    #[test]
    fn infinite_max_delay_does_not_panic() {
        let config = AnimationConfig { seed: 1, max_pulse_delay: f64::INFINITY };
        assert_eq!(pulse_delays(&config, 2), vec![0.0, 0.0]);
    }

    #[test]
    fn zero_max_delay_means_no_offset() {
        let config = AnimationConfig { seed: 1, max_pulse_delay: 0.0 };
        assert_eq!(pulse_delays(&config, 3), vec![0.0, 0.0, 0.0]);
    }
}
