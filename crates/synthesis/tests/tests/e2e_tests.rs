#[path = "e2e/full_run.rs"]
mod full_run;

#[path = "e2e/refinement_budget.rs"]
mod refinement_budget;

#[path = "e2e/provider_fallback.rs"]
mod provider_fallback;

#[path = "e2e/cancellation.rs"]
mod cancellation;

#[path = "e2e/degraded_embeddings.rs"]
mod degraded_embeddings;

#[path = "e2e/trap_escalation.rs"]
mod trap_escalation;
