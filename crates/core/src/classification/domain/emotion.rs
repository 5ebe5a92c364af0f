use std::fmt;

use serde::Serialize;

/// The closed set of labels the emotion model predicts, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const COUNT: usize = 7;

    pub const ALL: [Emotion; Emotion::COUNT] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn from_index(index: usize) -> Option<Emotion> {
        Self::ALL.get(index).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
            Emotion::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A label with the classifier's probability for it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EmotionResult {
    pub emotion: Emotion,
    pub confidence: f32,
}

impl EmotionResult {
    /// Picks the most probable label.
    ///
    /// Returns `None` unless `probabilities` has exactly [`Emotion::COUNT`]
    /// entries. Ties resolve to the earlier label.
    pub fn from_probabilities(probabilities: &[f32]) -> Option<EmotionResult> {
        if probabilities.len() != Emotion::COUNT {
            return None;
        }
        let (index, &confidence) = probabilities
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &f32)>, (i, p)| match best {
                Some((_, bp)) if *bp >= *p => best,
                _ => Some((i, p)),
            })?;
        Some(EmotionResult {
            emotion: Emotion::from_index(index)?,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    /// Overlay text, e.g. `Happy (97.3%)`.
    pub fn overlay_label(&self) -> String {
        format!("{} ({:.1}%)", self.emotion, self.confidence * 100.0)
    }
}

/// Turns raw scores into a distribution unless they already are one.
pub fn normalize_scores(scores: &mut [f32]) {
    let sum: f32 = scores.iter().sum();
    let is_distribution =
        scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() <= 1e-3;
    if is_distribution || scores.is_empty() {
        return;
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut total = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        total += *s;
    }
    for s in scores.iter_mut() {
        *s /= total;
    }
}
