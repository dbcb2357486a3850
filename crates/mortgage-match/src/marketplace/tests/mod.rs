mod common;
mod eligibility;
mod scoring;
