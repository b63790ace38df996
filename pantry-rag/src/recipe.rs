//! Recipe suggestions grounded in the reference document.
//!
//! [`RecipeAssistant`] is the consumer of the [`ContextEngine`]: it asks for
//! grounding context when the index is ready and falls back to ungrounded
//! generation on any retrieval failure. Retrieval never fails a request.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pantry_rag::{PantryItem, RecipeAssistant};
//!
//! let assistant = RecipeAssistant::new(engine, Arc::new(my_llm));
//! let text = assistant.suggest_recipes(&[PantryItem::new("chickpeas")]).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::ContextEngine;
use crate::error::Result;
use crate::format::format_context_for_prompt;

/// Produces text from a prompt, typically by calling a language model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// An ingredient available in the user's pantry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PantryItem {
    /// Ingredient name.
    pub name: String,
    /// Free-form quantity, e.g. `"2 cans"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

impl PantryItem {
    /// An item without a quantity.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), quantity: None }
    }

    /// Attach a quantity.
    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }
}

/// Build the recipe prompt.
///
/// `grounding` is `None` when retrieval was skipped or failed; the prompt then
/// carries no reference section. When retrieval ran, pass the formatted block
/// (which may be the "no relevant context" sentinel).
pub fn build_recipe_prompt(items: &[PantryItem], grounding: Option<&str>) -> String {
    let ingredients = items
        .iter()
        .map(|item| match &item.quantity {
            Some(quantity) => format!("- {} ({quantity})", item.name),
            None => format!("- {}", item.name),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::from(
        "You are a helpful cooking assistant. Suggest up to three recipes that make good use \
         of the ingredients below. For each recipe give a title, the ingredients it uses and \
         short numbered steps.\n\n",
    );
    prompt.push_str("Available ingredients:\n");
    prompt.push_str(&ingredients);

    if let Some(context) = grounding {
        prompt.push_str(
            "\n\nReference material (use it where relevant, do not invent facts beyond it):\n",
        );
        prompt.push_str(context);
    }
    prompt
}

/// Generates recipe suggestions, grounded when the context index is ready.
pub struct RecipeAssistant {
    engine: Arc<ContextEngine>,
    generator: Arc<dyn TextGenerator>,
    top_k: usize,
}

impl RecipeAssistant {
    /// Create an assistant retrieving the engine's configured `top_k` chunks.
    pub fn new(engine: Arc<ContextEngine>, generator: Arc<dyn TextGenerator>) -> Self {
        let top_k = engine.config().top_k;
        Self { engine, generator, top_k }
    }

    /// Override how many chunks are retrieved per request.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Formatted grounding context for `query`, or `None` if retrieval is
    /// unavailable or fails.
    pub async fn grounding_context(&self, query: &str) -> Option<String> {
        if !self.engine.is_ready() {
            debug!(status = ?self.engine.status(), "context index not ready, skipping retrieval");
            return None;
        }

        match self.engine.get_context(query, self.top_k).await {
            Ok(results) => Some(format_context_for_prompt(&results)),
            Err(e) => {
                warn!(error = %e, "retrieval failed, continuing without grounding");
                None
            }
        }
    }

    /// Suggest recipes for `items`.
    ///
    /// # Errors
    ///
    /// Only errors from the [`TextGenerator`] are returned.
    pub async fn suggest_recipes(&self, items: &[PantryItem]) -> Result<String> {
        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        let query = format!("recipes and storage tips for {}", names.join(", "));

        let grounding = self.grounding_context(&query).await;
        info!(item_count = items.len(), grounded = grounding.is_some(), "generating recipes");

        let prompt = build_recipe_prompt(items, grounding.as_deref());
        self.generator.generate(&prompt).await
    }
}
