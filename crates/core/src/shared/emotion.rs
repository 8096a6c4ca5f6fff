use serde::{Deserialize, Serialize};

/// The fixed emotion vocabulary, in canonical order.
///
/// Every score vector, histogram, and log line uses exactly these seven
/// categories; there is no "unknown" bucket. The declaration order is the
/// canonical order and breaks ties everywhere a maximum is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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
    /// All categories in canonical order.
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Position in the canonical order, for dense per-category arrays.
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-category confidence scores for one detected face.
///
/// Dense over the canonical order; categories a detector never mentions
/// stay at zero.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EmotionScores([f32; 7]);

impl EmotionScores {
    pub fn get(&self, emotion: Emotion) -> f32 {
        self.0[emotion.index()]
    }

    pub fn set(&mut self, emotion: Emotion, score: f32) {
        self.0[emotion.index()] = score;
    }

    /// The highest-scoring category; the earlier category in canonical
    /// order wins a tie. An all-zero vector yields `Angry`.
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::ALL[0];
        for emotion in &Emotion::ALL[1..] {
            if self.get(*emotion) > self.get(best) {
                best = *emotion;
            }
        }
        best
    }
}

impl FromIterator<(Emotion, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (Emotion, f32)>>(iter: I) -> Self {
        let mut scores = EmotionScores::default();
        for (emotion, score) in iter {
            scores.set(emotion, score);
        }
        scores
    }
}

/// Running per-session counters: one count per category plus the total.
///
/// Fields are private and the only mutation is [`EmotionSummary::record`],
/// so the histogram always sums to the total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmotionSummary {
    total_faces: u64,
    histogram: [u64; 7],
}

impl EmotionSummary {
    pub fn new() -> Self {
        Self {
            total_faces: 0,
            histogram: [0; 7],
        }
    }

    pub(crate) fn record(&mut self, emotion: Emotion) {
        self.total_faces += 1;
        self.histogram[emotion.index()] += 1;
    }

    pub fn total_faces(&self) -> u64 {
        self.total_faces
    }

    pub fn count(&self, emotion: Emotion) -> u64 {
        self.histogram[emotion.index()]
    }

    /// The most frequent category so far; earlier in canonical order wins
    /// a tie, and an empty summary yields `Angry`.
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::ALL[0];
        for emotion in &Emotion::ALL[1..] {
            if self.count(*emotion) > self.count(best) {
                best = *emotion;
            }
        }
        best
    }

    /// `(category, count)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, u64)> + '_ {
        Emotion::ALL.iter().map(|&e| (e, self.count(e)))
    }
}

impl Default for EmotionSummary {
    fn default() -> Self {
        Self::new()
    }
}
