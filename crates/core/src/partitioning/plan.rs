use super::{AUTO_PARTITIONED_COMMENT, PartitionSpec, PartitioningConfig};
use crate::{Renderer, Result, SchemaEditor};

/// Partitions to create and delete for a single model.
#[derive(Debug)]
pub struct ModelPartitioningPlan<'a> {
    pub config: &'a PartitioningConfig,
    pub creations: Vec<PartitionSpec>,
    pub deletions: Vec<PartitionSpec>,
}

impl<'a> ModelPartitioningPlan<'a> {
    #[must_use]
    pub fn new(config: &'a PartitioningConfig) -> Self {
        Self {
            config,
            creations: Vec::new(),
            deletions: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creations.is_empty() && self.deletions.is_empty()
    }

    /// Creates then deletes the planned partitions as one atomic unit.
    /// Created partitions are tagged so later plans may delete them.
    pub fn apply(&self, editor: &mut dyn SchemaEditor) -> Result<()> {
        let model = self.config.model();
        editor.atomic(&mut |editor: &mut dyn SchemaEditor| {
            for partition in &self.creations {
                partition.create(model, editor, Some(AUTO_PARTITIONED_COMMENT))?;
            }
            for partition in &self.deletions {
                partition.delete(model, editor)?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
pub struct PartitioningPlan<'a> {
    pub model_plans: Vec<ModelPartitioningPlan<'a>>,
}

impl<'a> PartitioningPlan<'a> {
    #[must_use]
    pub fn new(model_plans: Vec<ModelPartitioningPlan<'a>>) -> Self {
        Self { model_plans }
    }

    pub fn creations(&self) -> impl Iterator<Item = &PartitionSpec> {
        self.model_plans
            .iter()
            .flat_map(|model_plan| model_plan.creations.iter())
    }

    pub fn deletions(&self) -> impl Iterator<Item = &PartitionSpec> {
        self.model_plans
            .iter()
            .flat_map(|model_plan| model_plan.deletions.iter())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.model_plans.iter().all(ModelPartitioningPlan::is_empty)
    }

    /// Text shown to the operator before applying.
    #[must_use]
    pub fn render(&self) -> String {
        Renderer::new().render_plan(self)
    }

    pub fn apply(&self, editor: &mut dyn SchemaEditor) -> Result<()> {
        for model_plan in &self.model_plans {
            model_plan.apply(editor)?;
        }
        Ok(())
    }
}
