use std::fmt::Write as _;

use crate::{PartitionSpec, PartitioningPlan, Statement};

/// Turns plans and collected statements into terminal text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn render_plan(&self, plan: &PartitioningPlan<'_>) -> String {
        let mut rendered = String::new();

        for model_plan in &plan.model_plans {
            writeln!(rendered, "{}:", model_plan.config.model().name)
                .expect("writing to String should not fail");
            for partition in &model_plan.deletions {
                self.render_partition(&mut rendered, '-', partition);
            }
            for partition in &model_plan.creations {
                self.render_partition(&mut rendered, '+', partition);
            }
            rendered.push('\n');
        }

        writeln!(
            rendered,
            "{} partitions will be deleted",
            plan.deletions().count()
        )
        .expect("writing to String should not fail");
        writeln!(
            rendered,
            "{} partitions will be created",
            plan.creations().count()
        )
        .expect("writing to String should not fail");

        rendered
    }

    #[must_use]
    pub fn render_statements(&self, statements: &[Statement]) -> String {
        let mut rendered = String::new();
        for statement in statements {
            rendered.push_str(statement.sql());
            rendered.push_str(";\n");
        }
        rendered
    }

    fn render_partition(&self, rendered: &mut String, marker: char, partition: &PartitionSpec) {
        writeln!(rendered, "  {marker} {}", partition.name())
            .expect("writing to String should not fail");
        for (key, value) in partition.deconstruct() {
            writeln!(rendered, "     {key}: {value}").expect("writing to String should not fail");
        }
    }
}
