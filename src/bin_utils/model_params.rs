use evogym_models::nn::NonLinearity;

/// Capture the policy parameters.  Right now just a feed-forward network.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Hidden layer widths; empty for a linear policy
    pub hidden_nodes: Vec<usize>,
    /// Type of non-linearity between layers
    pub act: NonLinearity,
    /// Action selection mode, `max` or `random`
    pub selection: String,
    /// Seeds the noise, the action sampling and the random start
    pub seed: u64,
    /// Whether the initial weights are drawn from [-1, 1] instead of zeros
    pub random_start: bool,
    /// If provided, each weight of a particle is perturbed with this probability
    pub mask: Option<f32>,
    /// Optional path to load a policy
    pub load_model_path: Option<String>,
    /// Optional path to save the policy
    pub save_model_path: Option<String>,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            hidden_nodes: Vec::new(),
            act: NonLinearity::ReLu,
            selection: "max".into(),
            seed: 2018,
            random_start: false,
            mask: None,
            load_model_path: None,
            save_model_path: None,
        }
    }
}
