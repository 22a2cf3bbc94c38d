//! XGBoost JSON Model - gradient-boosted tree evaluator
//!
//! Reads the document written by `Booster.save_model("*.json")` and
//! evaluates it without linking libxgboost.
//!
//! ## Model layout used here:
//! - `learner.objective.name` decides the output transform
//! - `learner.learner_model_param.base_score` is the global bias (probability
//!   space for logistic objectives, margin space otherwise)
//! - `learner.gradient_booster.model.trees[i]` are flat node arrays; a node
//!   with `left_children[n] == -1` is a leaf and its value is
//!   `split_conditions[n]`
//! - `tree_info[i]` is the output group (class) tree `i` contributes to

use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1};
use serde::Deserialize;

use super::{Classifier, ModelError, Prediction};

// ============================================================================
// JSON DOCUMENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModelDocument {
    learner: LearnerDoc,
}

#[derive(Debug, Deserialize)]
struct LearnerDoc {
    gradient_booster: BoosterDoc,
    learner_model_param: LearnerParamDoc,
    objective: ObjectiveDoc,
}

#[derive(Debug, Deserialize)]
struct BoosterDoc {
    name: String,
    #[serde(default)]
    model: Option<GbTreeDoc>,
}

#[derive(Debug, Deserialize)]
struct GbTreeDoc {
    trees: Vec<TreeDoc>,
    tree_info: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct TreeDoc {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct LearnerParamDoc {
    base_score: Scalar,
    #[serde(default)]
    num_class: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveDoc {
    name: String,
}

/// Older writers emit booleans, newer ones 0/1
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// Model params are strings (`"5E-1"`, `"[5E-1]"`), occasionally numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(f64),
}

impl Scalar {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim()
                .parse()
                .ok(),
        }
    }
}

// ============================================================================
// OBJECTIVE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `binary:logistic`: sigmoid of the margin
    Logistic,
    /// `binary:logitraw`: raw margin, class = margin > 0
    LogitRaw,
    /// `binary:hinge`: class = margin > 0
    Hinge,
    /// `multi:softprob`
    Softprob,
    /// `multi:softmax`
    Softmax,
}

impl Objective {
    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        match name {
            "binary:logistic" => Ok(Objective::Logistic),
            "binary:logitraw" => Ok(Objective::LogitRaw),
            "binary:hinge" => Ok(Objective::Hinge),
            "multi:softprob" => Ok(Objective::Softprob),
            "multi:softmax" => Ok(Objective::Softmax),
            other => Err(ModelError::UnsupportedObjective(other.to_string())),
        }
    }

    pub fn is_multiclass(self) -> bool {
        matches!(self, Objective::Softprob | Objective::Softmax)
    }

    /// Convert the stored base score to margin space
    fn base_margin(self, base_score: f64) -> f32 {
        match self {
            Objective::Logistic | Objective::LogitRaw => {
                let p = base_score.clamp(1e-7, 1.0 - 1e-7);
                (p / (1.0 - p)).ln() as f32
            }
            _ => base_score as f32,
        }
    }
}

// ============================================================================
// TREES
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_doc(doc: TreeDoc) -> Result<Self, String> {
        let n = doc.left_children.len();
        if n == 0 {
            return Err("empty tree".to_string());
        }
        if doc.right_children.len() != n
            || doc.split_indices.len() != n
            || doc.split_conditions.len() != n
            || doc.default_left.len() != n
        {
            return Err("node arrays differ in length".to_string());
        }
        if doc.split_type.iter().any(|&t| t != 0) {
            return Err("categorical splits are not supported".to_string());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = doc.left_children[i];
            if left < 0 {
                nodes.push(Node::Leaf(doc.split_conditions[i]));
                continue;
            }

            // Children always come after their parent, which rules out cycles
            let child = |c: i64| -> Result<usize, String> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| format!("node {} has invalid child {}", i, c))
            };
            let feature = usize::try_from(doc.split_indices[i])
                .map_err(|_| format!("node {} has negative split index", i))?;

            nodes.push(Node::Split {
                feature,
                threshold: doc.split_conditions[i],
                left: child(left)?,
                right: child(doc.right_children[i])?,
                default_left: doc.default_left[i].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    /// Leaf value reached by `row`; NaN and out-of-range features are missing
    fn leaf_value(&self, row: ArrayView1<f32>) -> f32 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row.get(feature).copied().unwrap_or(f32::NAN);
                    index = if x.is_nan() {
                        if default_left { left } else { right }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone)]
pub struct XgbClassifier {
    objective: Objective,
    base_margin: f32,
    n_groups: usize,
    trees: Vec<Tree>,
    tree_groups: Vec<usize>,
}

impl XgbClassifier {
    /// Load a model saved in XGBoost's JSON format
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        log::info!("Loading XGBoost model from: {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let model = Self::from_json(&text, path)?;

        log::info!(
            "XGBoost model loaded: {} trees, objective {:?}, {} output group(s)",
            model.trees.len(),
            model.objective,
            model.n_groups
        );

        Ok(model)
    }

    /// Parse a JSON model document; `origin` is only used in error messages
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, ModelError> {
        let doc: ModelDocument = serde_json::from_str(text).map_err(|source| ModelError::Json {
            path: origin.to_path_buf(),
            source,
        })?;
        let invalid = |reason: String| ModelError::InvalidModel {
            path: PathBuf::from(origin),
            reason,
        };

        let learner = doc.learner;
        let objective = Objective::from_name(&learner.objective.name)?;

        if learner.gradient_booster.name != "gbtree" {
            return Err(invalid(format!(
                "unsupported booster '{}'",
                learner.gradient_booster.name
            )));
        }
        let gbtree = learner
            .gradient_booster
            .model
            .ok_or_else(|| invalid("missing gradient_booster.model".to_string()))?;

        let base_score = learner
            .learner_model_param
            .base_score
            .as_f64()
            .ok_or_else(|| invalid("unreadable base_score".to_string()))?;

        let n_groups = if objective.is_multiclass() {
            let num_class = learner
                .learner_model_param
                .num_class
                .as_ref()
                .and_then(Scalar::as_f64)
                .unwrap_or(0.0) as usize;
            if num_class < 2 {
                return Err(invalid(format!("multiclass model with num_class={}", num_class)));
            }
            num_class
        } else {
            1
        };

        if gbtree.tree_info.len() != gbtree.trees.len() {
            return Err(invalid("tree_info does not match trees".to_string()));
        }
        let tree_groups = gbtree
            .tree_info
            .iter()
            .map(|&g| {
                usize::try_from(g)
                    .ok()
                    .filter(|&g| g < n_groups)
                    .ok_or_else(|| invalid(format!("tree group {} out of range", g)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let trees = gbtree
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::from_doc(t).map_err(|e| invalid(format!("tree {}: {}", i, e))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            objective,
            base_margin: objective.base_margin(base_score),
            n_groups,
            trees,
            tree_groups,
        })
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Summed margins per output group for one row
    fn margins(&self, row: ArrayView1<f32>, out: &mut [f32]) {
        out.fill(self.base_margin);
        for (tree, &group) in self.trees.iter().zip(&self.tree_groups) {
            out[group] += tree.leaf_value(row);
        }
    }
}

impl Classifier for XgbClassifier {
    fn predict(&self, features: &Array2<f32>) -> Result<Prediction, ModelError> {
        let n_rows = features.nrows();
        let width = if self.objective.is_multiclass() { self.n_groups } else { 2 };

        let mut classes = Vec::with_capacity(n_rows);
        let mut probabilities = Array2::<f32>::zeros((n_rows, width));
        let mut margins = vec![0.0f32; self.n_groups];

        for (i, row) in features.outer_iter().enumerate() {
            self.margins(row, &mut margins);

            match self.objective {
                Objective::Logistic => {
                    let p = sigmoid(margins[0]);
                    probabilities[[i, 0]] = 1.0 - p;
                    probabilities[[i, 1]] = p;
                    classes.push(usize::from(p > 0.5));
                }
                Objective::LogitRaw | Objective::Hinge => {
                    classes.push(usize::from(margins[0] > 0.0));
                }
                Objective::Softprob | Objective::Softmax => {
                    softmax(&mut margins);
                    for (k, &p) in margins.iter().enumerate() {
                        probabilities[[i, k]] = p;
                    }
                    classes.push(argmax(&margins));
                }
            }
        }

        let probabilities = match self.objective {
            Objective::LogitRaw | Objective::Hinge => None,
            _ => Some(probabilities),
        };

        Ok(Prediction { classes, probabilities })
    }

    fn backend(&self) -> &'static str {
        "xgboost-json"
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

/// Index of the first maximum
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
