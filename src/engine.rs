use std::sync::{Arc, OnceLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::emotion::lexicon::LexiconModel;
use crate::emotion::{EmotionClassifier, EmotionResult, EmotionScores};
use crate::error::{EngineError, ModelError};
use crate::explain;
use crate::features;
use crate::model::{ModelParameters, RiskPredictor};
use crate::models::{
    lenient, RiskAssessment, RiskCategory, RiskProbabilities, StudentAssessment, StudentRecord,
    StudentSignals,
};
use crate::mood;
use crate::risk;

const EMOTION_MODEL: &str = "emotion model";
const RISK_MODEL: &str = "risk model";

/// Emotional context attached to an assessment.
#[derive(Debug, Clone, Default)]
pub enum EmotionInput {
    #[default]
    None,
    /// A result from an earlier `analyze_text` call.
    Analyzed(EmotionResult),
    /// Raw text, classified as part of the assessment. `fallback` scores are
    /// used instead when no emotion model is loaded.
    Text {
        text: String,
        fallback: Option<EmotionScores>,
    },
    /// Per-emotion scores supplied by the caller.
    Scores(EmotionScores),
}

/// JSON boundary record for a single assessment.
///
/// Emotion sources are taken in precedence order: `emotion_data`, then
/// `text`, then the individual `emotion_*` scores.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessRequest {
    #[serde(flatten)]
    pub signals: StudentSignals,
    #[serde(default)]
    pub emotion_data: Option<EmotionResult>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub emotion_joy: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub emotion_sadness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub emotion_anger: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub emotion_fear: Option<f64>,
}

impl AssessRequest {
    pub fn into_parts(self) -> (StudentSignals, EmotionInput) {
        let scores = (self.emotion_joy.is_some()
            || self.emotion_sadness.is_some()
            || self.emotion_anger.is_some()
            || self.emotion_fear.is_some())
        .then(|| EmotionScores {
            joy: self.emotion_joy.unwrap_or(0.0),
            sadness: self.emotion_sadness.unwrap_or(0.0),
            anger: self.emotion_anger.unwrap_or(0.0),
            fear: self.emotion_fear.unwrap_or(0.0),
        });

        let input = match (self.emotion_data, self.text, scores) {
            (Some(result), _, _) => EmotionInput::Analyzed(result),
            (None, Some(text), fallback) => EmotionInput::Text { text, fallback },
            (None, None, Some(scores)) => EmotionInput::Scores(scores),
            (None, None, None) => EmotionInput::None,
        };
        (self.signals, input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub emotion_model: Option<String>,
    pub risk_model: Option<String>,
}

#[derive(Debug)]
struct LoadedModels {
    emotion: Option<EmotionClassifier>,
    risk: Option<RiskPredictor>,
}

#[derive(Debug)]
pub struct RiskEngine {
    config: EngineConfig,
    models: OnceLock<LoadedModels>,
}

impl RiskEngine {
    /// An engine that is not ready until [`load`](Self::load) runs.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            models: OnceLock::new(),
        }
    }

    /// An engine that is ready immediately with the given models.
    pub fn with_models(
        config: EngineConfig,
        emotion: Option<EmotionClassifier>,
        risk: Option<RiskPredictor>,
    ) -> Self {
        let engine = Self::new(config);
        let _ = engine.models.set(LoadedModels { emotion, risk });
        engine
    }

    /// Load both models. Blocking; later calls are no-ops.
    pub fn load(&self) {
        self.models.get_or_init(|| {
            let started = Instant::now();
            let models = if self.config.models_enabled {
                LoadedModels {
                    emotion: self.load_emotion_model(),
                    risk: self.load_risk_model(),
                }
            } else {
                tracing::warn!("model loading disabled; assessments will report models unavailable");
                LoadedModels {
                    emotion: None,
                    risk: None,
                }
            };
            tracing::info!(
                emotion = models.emotion.is_some(),
                risk = models.risk.is_some(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "engine ready"
            );
            models
        });
    }

    /// Run [`load`](Self::load) on the blocking pool.
    pub fn load_in_background(self: Arc<Self>) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.load())
    }

    fn load_emotion_model(&self) -> Option<EmotionClassifier> {
        let settings = &self.config.emotion;
        let backend = match &settings.lexicon_path {
            Some(path) => match LexiconModel::from_path(path) {
                Ok(model) => model,
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "failed to load emotion lexicon");
                    return None;
                }
            },
            None => LexiconModel::default(),
        };
        let classifier = EmotionClassifier::new(backend).with_max_chars(settings.max_text_chars);
        tracing::info!(backend = classifier.backend_name(), "emotion model loaded");
        Some(classifier)
    }

    fn load_risk_model(&self) -> Option<RiskPredictor> {
        let settings = &self.config.risk_model;
        let loaded = match &settings.parameters_path {
            Some(path) => {
                ModelParameters::from_path(path).and_then(RiskPredictor::from_parameters)
            }
            None => RiskPredictor::bootstrap(settings),
        };
        match loaded {
            Ok(predictor) => {
                tracing::info!(
                    kind = %predictor.kind(),
                    trained_on = predictor.parameters().trained_on,
                    "risk model loaded"
                );
                Some(predictor)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load risk model");
                None
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.models.get().is_some()
    }

    pub fn status(&self) -> EngineStatus {
        match self.models.get() {
            Some(models) => EngineStatus {
                ready: true,
                emotion_model: models
                    .emotion
                    .as_ref()
                    .map(|classifier| classifier.backend_name().to_string()),
                risk_model: models.risk.as_ref().map(|predictor| predictor.kind().to_string()),
            },
            None => EngineStatus {
                ready: false,
                emotion_model: None,
                risk_model: None,
            },
        }
    }

    fn models(&self) -> Result<&LoadedModels, EngineError> {
        self.models.get().ok_or(EngineError::NotReady)
    }

    pub fn analyze_text(&self, text: &str) -> Result<EmotionResult, EngineError> {
        let classifier = self
            .models()?
            .emotion
            .as_ref()
            .ok_or(EngineError::ModelUnavailable(EMOTION_MODEL))?;
        Ok(classifier.analyze(text))
    }

    pub fn assess_risk(
        &self,
        signals: &StudentSignals,
        input: EmotionInput,
    ) -> Result<RiskAssessment, EngineError> {
        let models = self.models()?;
        let predictor = models
            .risk
            .as_ref()
            .ok_or(EngineError::ModelUnavailable(RISK_MODEL))?;

        let emotion = match input {
            EmotionInput::None => None,
            EmotionInput::Analyzed(result) => Some(result),
            EmotionInput::Scores(scores) => Some(EmotionResult::from_explicit_scores(&scores)),
            EmotionInput::Text { text, fallback } => match (&models.emotion, fallback) {
                (Some(classifier), _) => Some(classifier.analyze(&text)),
                (None, Some(scores)) => {
                    tracing::warn!("emotion model unavailable; using supplied emotion scores");
                    Some(EmotionResult::from_explicit_scores(&scores))
                }
                (None, None) => {
                    tracing::warn!("emotion model unavailable; assessing without text");
                    None
                }
            },
        };

        let mut signals = signals.clone();
        if signals.mood_score.is_none() {
            if let Some(result) = emotion.as_ref().filter(|r| r.is_usable() && r.confidence > 0.0) {
                let derived = mood::mood_score(result);
                tracing::debug!(mood = derived, emotion = %result.primary_emotion, "mood derived from emotion");
                signals.mood_score = Some(derived);
            }
        }

        let features = features::extract(&signals, emotion.as_ref());
        let factors = explain::generate(&features, emotion.as_ref());

        match predictor.predict(&features) {
            Ok(probabilities) => {
                let (risk_score, category) = risk::combine(&probabilities);
                tracing::debug!(risk_score, category = %category, "risk assessed");
                Ok(RiskAssessment {
                    risk_score,
                    category,
                    probabilities: probabilities.rounded(4),
                    explanation: explain::lines(&factors),
                    factors,
                    error: None,
                })
            }
            Err(err) => {
                tracing::error!(error = %err, "risk prediction failed");
                Ok(degraded_assessment(&err))
            }
        }
    }

    pub fn assess_request(&self, request: AssessRequest) -> Result<RiskAssessment, EngineError> {
        let (signals, input) = request.into_parts();
        self.assess_risk(&signals, input)
    }

    /// Assess every student, using their journal text when present.
    pub fn assess_students(
        &self,
        students: &[StudentRecord],
    ) -> Result<Vec<StudentAssessment>, EngineError> {
        students
            .iter()
            .map(|student| {
                let input = student
                    .journal
                    .as_ref()
                    .filter(|text| !text.trim().is_empty())
                    .map(|text| EmotionInput::Text {
                        text: text.clone(),
                        fallback: None,
                    })
                    .unwrap_or_default();
                let assessment = self.assess_risk(&student.signals, input)?;
                Ok(StudentAssessment {
                    student_id: student.student_id,
                    full_name: student.full_name.clone(),
                    email: student.email.clone(),
                    cohort: student.cohort.clone(),
                    assessment,
                })
            })
            .collect()
    }
}

/// Moderate-risk result used when inference fails.
fn degraded_assessment(err: &ModelError) -> RiskAssessment {
    RiskAssessment {
        risk_score: 0.5,
        category: RiskCategory::Moderate,
        probabilities: RiskProbabilities {
            low: 0.0,
            moderate: 1.0,
            high: 0.0,
        },
        explanation: vec!["error in prediction".to_string()],
        factors: Vec::new(),
        error: Some(err.to_string()),
    }
}
