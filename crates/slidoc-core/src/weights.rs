//! Running question weight totals for one file.

/// Cumulative score and grade weights, indexed by qnumber.
///
/// Index 0 holds 0 so that `cum[q]` is the total of questions `1..=q`
/// and the weight strictly after question `a` up to `b` is
/// `cum[b] - cum[a]`.
#[derive(Debug, Clone)]
pub struct WeightLedger {
    cum_score: Vec<f64>,
    cum_grade: Vec<f64>,
    /// Slide number of each question, in qnumber order
    question_slides: Vec<usize>,
}

impl Default for WeightLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightLedger {
    pub fn new() -> Self {
        Self {
            cum_score: vec![0.0],
            cum_grade: vec![0.0],
            question_slides: Vec::new(),
        }
    }

    /// Record an accepted question, returning its qnumber
    pub fn push(&mut self, slide: usize, weight: f64, gweight: Option<f64>) -> usize {
        let score = self.cum_score.last().copied().unwrap_or(0.0) + weight;
        let grade = self.cum_grade.last().copied().unwrap_or(0.0) + gweight.unwrap_or(0.0);
        self.cum_score.push(score);
        self.cum_grade.push(grade);
        self.question_slides.push(slide);
        self.question_slides.len()
    }

    /// Number of questions on slides before `slide`
    pub fn questions_before(&self, slide: usize) -> usize {
        self.question_slides.iter().take_while(|s| **s < slide).count()
    }

    /// Score weight of questions `after+1..=upto`
    pub fn score_between(&self, after: usize, upto: usize) -> f64 {
        self.cum_score[upto] - self.cum_score[after]
    }

    /// Grade weight of questions `after+1..=upto`
    pub fn grade_between(&self, after: usize, upto: usize) -> f64 {
        self.cum_grade[upto] - self.cum_grade[after]
    }

    pub fn into_arrays(self) -> (Vec<f64>, Vec<f64>) {
        (self.cum_score, self.cum_grade)
    }
}
