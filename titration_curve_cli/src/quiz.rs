//! Curve-reading quiz: random scenarios, multiple-choice questions and grading.
//!
//! Session state is a plain value. `submit` and `QuizState::next` take the
//! state by value and return the updated one.

use rand::seq::SliceRandom;
use rand::Rng;
use titration_curve::{landmarks, Result, Scenario, TitrationType, VolumeGrid};

/// Analyte concentrations offered by the generator (mol/L).
const CONCENTRATIONS: [f64; 3] = [0.05, 0.1, 0.2];
/// Analyte volumes offered by the generator (L).
const VOLUMES: [f64; 2] = [0.025, 0.05];
/// Titrant concentration as a multiple of the analyte concentration.
const TITRANT_FACTORS: [f64; 2] = [1.0, 2.0];

/// pKa of common weak acids: HF, formic, benzoic, acetic, carbonic (first).
const WEAK_ACID_PKAS: [f64; 5] = [3.17, 3.75, 4.20, 4.76, 6.35];
/// pKa of the conjugate acids of pyridine, tris, ammonia and methylamine.
const WEAK_BASE_PKAS: [f64; 4] = [5.23, 8.07, 9.25, 10.64];

const PH_OFFSETS: [f64; 8] = [-3.0, -2.0, -1.5, -1.0, 1.0, 1.5, 2.0, 3.0];
const VOLUME_FACTORS: [f64; 4] = [0.5, 0.75, 1.5, 2.0];

const CHOICES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionKind {
    EquivalencePh,
    EquivalenceVolume,
    Pka,
}

#[derive(Clone, Debug)]
pub struct Question {
    pub kind: QuestionKind,
    pub scenario: Scenario,
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer: usize,
}

#[derive(Clone, Debug)]
pub struct QuizState {
    pub question: Question,
    pub submitted: bool,
    pub feedback: Option<String>,
    pub correct: u32,
    pub asked: u32,
}

impl QuizState {
    pub fn new(question: Question) -> Self {
        Self {
            question,
            submitted: false,
            feedback: None,
            correct: 0,
            asked: 0,
        }
    }

    /// Move on to `question`, keeping the running score.
    pub fn next(self, question: Question) -> Self {
        Self {
            question,
            submitted: false,
            feedback: None,
            ..self
        }
    }
}

/// Draw a scenario whose equivalence point falls within the first 50 mL.
pub fn generate_scenario<R: Rng + ?Sized>(rng: &mut R) -> Result<Scenario> {
    let kind = *TitrationType::ALL.choose(rng).unwrap_or(&TitrationType::StrongAcidStrongBase);
    let volume = *VOLUMES.choose(rng).unwrap_or(&VOLUMES[0]);
    let concentration = *CONCENTRATIONS.choose(rng).unwrap_or(&CONCENTRATIONS[0]);
    let factor = *TITRANT_FACTORS.choose(rng).unwrap_or(&TITRANT_FACTORS[0]);
    let pka = match kind {
        TitrationType::WeakAcidStrongBase => WEAK_ACID_PKAS.choose(rng).copied(),
        TitrationType::WeakBaseStrongAcid => WEAK_BASE_PKAS.choose(rng).copied(),
        TitrationType::StrongAcidStrongBase | TitrationType::StrongBaseStrongAcid => None,
    };
    Scenario::new(kind, volume, concentration, concentration * factor, pka)
}

/// Plotting grid that places the equivalence point mid-chart.
pub fn question_grid(scenario: &Scenario) -> Result<VolumeGrid> {
    VolumeGrid::new(0.0, 2.0 * scenario.equivalence_volume(), 500)
}

pub fn build_question<R: Rng + ?Sized>(scenario: &Scenario, rng: &mut R) -> Result<Question> {
    let kinds: &[QuestionKind] = if scenario.titration_type().is_weak() {
        &[
            QuestionKind::EquivalencePh,
            QuestionKind::EquivalenceVolume,
            QuestionKind::Pka,
        ]
    } else {
        &[QuestionKind::EquivalencePh, QuestionKind::EquivalenceVolume]
    };
    let kind = *kinds.choose(rng).unwrap_or(&QuestionKind::EquivalencePh);
    let marks = landmarks(scenario)?;

    let (prompt, truth, distractors): (String, String, Vec<String>) = match kind {
        QuestionKind::EquivalencePh => (
            "What is the pH at the equivalence point?".to_string(),
            format_ph(marks.ph_at_equivalence),
            ph_distractors(marks.ph_at_equivalence, rng)
                .into_iter()
                .map(format_ph)
                .collect(),
        ),
        QuestionKind::Pka => (
            format!(
                "Reading the curve at half-equivalence, what is the pKa of the weak {}?",
                scenario.titration_type().analyte_name()
            ),
            format_pka(marks.ph_at_half_equivalence),
            ph_distractors(marks.ph_at_half_equivalence, rng)
                .into_iter()
                .map(format_pka)
                .collect(),
        ),
        QuestionKind::EquivalenceVolume => (
            format!(
                "How much {} is needed to reach the equivalence point?",
                scenario.titration_type().titrant_name()
            ),
            format_ml(marks.equivalence_volume),
            VOLUME_FACTORS
                .choose_multiple(rng, CHOICES - 1)
                .map(|factor| format_ml(marks.equivalence_volume * factor))
                .collect(),
        ),
    };

    let mut choices = distractors;
    choices.push(truth.clone());
    choices.shuffle(rng);
    let answer = choices.iter().position(|c| *c == truth).unwrap_or(0);

    Ok(Question {
        kind,
        scenario: scenario.clone(),
        prompt,
        choices,
        answer,
    })
}

/// Grade `choice` against the current question. A second submission for the
/// same question leaves the state unchanged.
pub fn submit(state: QuizState, choice: usize) -> QuizState {
    if state.submitted {
        return state;
    }
    let expected = &state.question.choices[state.question.answer];
    let is_correct = choice == state.question.answer;
    let feedback = if is_correct {
        format!("Correct: {expected}.")
    } else {
        format!("Not quite. The answer is {expected}.")
    };
    QuizState {
        submitted: true,
        feedback: Some(feedback),
        correct: state.correct + u32::from(is_correct),
        asked: state.asked + 1,
        ..state
    }
}

/// One-paragraph description of the setup shown with each question.
pub fn describe(scenario: &Scenario) -> String {
    let kind = scenario.titration_type();
    let pka = scenario
        .pka()
        .map(|p| format!("{p:.2}"))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "{kind}: {:.1} mL of {:.3} M {} titrated with {:.3} M {} (pKa {pka}).",
        scenario.initial_volume() * 1000.0,
        scenario.initial_concentration(),
        kind.analyte_name(),
        scenario.titrant_concentration(),
        kind.titrant_name(),
    )
}

/// Wrong answers on the pH scale, offset from `truth` and kept within 0-14.
fn ph_distractors<R: Rng + ?Sized>(truth: f64, rng: &mut R) -> Vec<f64> {
    let candidates: Vec<f64> = PH_OFFSETS
        .iter()
        .map(|offset| truth + offset)
        .filter(|ph| (0.0..=14.0).contains(ph))
        .collect();
    candidates
        .choose_multiple(rng, CHOICES - 1)
        .copied()
        .collect()
}

fn format_ph(ph: f64) -> String {
    format!("pH {ph:.2}")
}

fn format_pka(pka: f64) -> String {
    format!("pKa {pka:.2}")
}

fn format_ml(liters: f64) -> String {
    format!("{:.1} mL", liters * 1000.0)
}
