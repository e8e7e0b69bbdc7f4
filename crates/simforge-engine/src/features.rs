//! Feature call sites.
//!
//! One function per user-facing feature. Each builds a `TaskRequest` with a
//! fixed category and output contract and delegates to the Apex Loop; this
//! is the only integration point feature code needs.

use simforge_core::{
    FieldKind, FieldSpec, OutputContract, TaskCategory, TaskRequest, TaskResult,
};

use crate::executor::ApexLoop;

/// Contract for the structured plan produced by goal decomposition.
pub fn task_plan_contract() -> OutputContract {
    OutputContract::new("task_plan")
        .with_field(FieldSpec::new("tasks", FieldKind::Array).non_empty())
}

/// Contract for generated world state.
pub fn world_state_contract() -> OutputContract {
    OutputContract::new("world_state")
        .with_field(FieldSpec::new("name", FieldKind::String).non_empty())
        .with_field(FieldSpec::new("description", FieldKind::String))
        .with_field(FieldSpec::new("physics", FieldKind::Object).optional())
}

/// Contract for translated user intent.
pub fn translation_contract() -> OutputContract {
    OutputContract::new("translation")
        .with_field(FieldSpec::new("intent", FieldKind::String).non_empty())
        .with_field(
            FieldSpec::new("confidence", FieldKind::Number)
                .with_min(0.0)
                .with_max(1.0)
                .optional(),
        )
}

/// Contract for numeric work.
pub fn solution_contract() -> OutputContract {
    OutputContract::new("solution")
        .with_field(FieldSpec::new("result", FieldKind::Number))
        .with_field(FieldSpec::new("working", FieldKind::String).optional())
}

/// Contract for document/image ingestion.
pub fn extraction_contract() -> OutputContract {
    OutputContract::new("extraction")
        .with_field(FieldSpec::new("summary", FieldKind::String).non_empty())
        .with_field(FieldSpec::new("key_points", FieldKind::Array).optional())
}

/// Default contract for a category, used for decomposed sub-tasks.
pub fn contract_for(category: TaskCategory) -> OutputContract {
    match category {
        TaskCategory::Physics => world_state_contract(),
        TaskCategory::Reflex => translation_contract(),
        TaskCategory::Math => solution_contract(),
        TaskCategory::Ingest => extraction_contract(),
    }
}

/// Build the decomposition prompt for a goal.
pub fn build_plan_prompt(goal: &str, context: &str) -> String {
    format!(
        r#"Decompose the following goal into independent sub-tasks.

## Goal
{goal}

## Shared Context
{context}

## Instructions
Produce between 1 and 8 sub-tasks. Each sub-task needs:
1. **category**: PHYSICS | REFLEX | MATH | INGEST
2. **objective**: one sentence describing what to produce

## Response Format
Respond with a JSON object only, no additional text:
{{"tasks": [{{"category": "...", "objective": "..."}}]}}"#
    )
}

/// Generate structured world state from a natural-language description.
pub async fn generate_world_state(apex: &ApexLoop, description: &str) -> TaskResult {
    let prompt = format!(
        r#"Turn the following description into a simulated world.

## Description
{description}

## Response Format
Respond with a JSON object only, no additional text:
{{"name": "...", "description": "...", "physics": {{"gravity": 9.8}}}}"#
    );
    let request = TaskRequest::new(TaskCategory::Physics, prompt, world_state_contract());
    apex.execute(&request).await
}

/// Translate a raw user utterance into an actionable intent.
pub async fn translate_intent(apex: &ApexLoop, utterance: &str) -> TaskResult {
    let prompt = format!(
        r#"Interpret the user's utterance as a sandbox command.

## Utterance
{utterance}

## Response Format
Respond with a JSON object only, no additional text:
{{"intent": "...", "confidence": 0.9}}"#
    );
    let request = TaskRequest::new(TaskCategory::Reflex, prompt, translation_contract());
    apex.execute(&request).await
}

/// Summarize ingested material into findings.
pub async fn summarize_findings(apex: &ApexLoop, material: &str) -> TaskResult {
    let prompt = format!(
        r#"Summarize the following material for the mission log.

## Material
{material}

## Response Format
Respond with a JSON object only, no additional text:
{{"summary": "...", "key_points": ["..."]}}"#
    );
    let request = TaskRequest::new(TaskCategory::Ingest, prompt, extraction_contract());
    apex.execute(&request).await
}
