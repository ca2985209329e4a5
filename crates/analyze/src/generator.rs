//! Path generator.
//!
//! Depth-first exploration of the step/transition graph from the entry
//! step. Leaving a step with outgoing transitions `t1..tn` (priority order)
//! yields one branch per transition, "`t1..ti-1` false, `ti` true", plus a
//! blocked branch "all false" when the last transition is guarded. Each
//! branch pins field values that realize its decisions, and every finished
//! path is replayed against the evaluator before it is kept.
//!
//! All randomness flows from one `StdRng` seeded from the options, so a
//! fixed schema, seed and option set always produce the same report.

use std::collections::{BTreeMap, BTreeSet};

use formflow_core::{Rule, Transition, UnifiedFormSchema};
use formflow_eval::{admission_rule, evaluate, CustomRuleRegistry, RuleError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::datagen::{DataSynth, Draft};
use crate::error::GenerationError;
use crate::negative::{generate_boundary_paths, generate_error_paths};
use crate::options::{Coverage, GenerationOptions};
use crate::prune::prune_paths;
use crate::replay::Navigator;
use crate::report::{GenerationReport, Outcome, SkippedBranch, TestPath};

/// Hard cap on candidate paths collected before pruning.
const EXPLORATION_LIMIT: usize = 10_000;

/// Generate paths with no custom predicates available. Branches that need
/// one are reported as skipped.
pub fn generate_paths(
    schema: &UnifiedFormSchema,
    options: &GenerationOptions,
) -> Result<GenerationReport, GenerationError> {
    let registry = CustomRuleRegistry::new();
    PathGenerator::new(&registry).generate(schema, options)
}

pub struct PathGenerator<'r> {
    registry: &'r CustomRuleRegistry,
}

impl<'r> PathGenerator<'r> {
    pub fn new(registry: &'r CustomRuleRegistry) -> Self {
        PathGenerator { registry }
    }

    pub fn generate(
        &self,
        schema: &UnifiedFormSchema,
        options: &GenerationOptions,
    ) -> Result<GenerationReport, GenerationError> {
        schema.validate()?;
        let mut rng = StdRng::seed_from_u64(options.seed);

        let mut explorer = Explorer::new(schema, self.registry, options);
        explorer.run(&mut rng)?;
        let Explorer {
            found,
            skipped,
            depth_limited,
            unsatisfiable,
            capped,
            ..
        } = explorer;

        let mut candidates = match options.coverage {
            Coverage::Minimal => shortest_per_terminal(found),
            Coverage::Representative | Coverage::Exhaustive => found,
        };

        if options.include_invalid {
            let boundary = generate_boundary_paths(schema, &candidates, self.registry);
            let errors = generate_error_paths(schema, &candidates, self.registry, &mut rng);
            debug!(
                boundary = boundary.len(),
                errors = errors.len(),
                "synthesized negative paths"
            );
            candidates.extend(boundary);
            candidates.extend(errors);
        }

        let (mut paths, pruned) = prune_paths(candidates, options.max_paths);
        for (i, path) in paths.iter_mut().enumerate() {
            path.id = format!("path-{:04}", i + 1);
        }

        let report = GenerationReport {
            paths,
            truncated: pruned || capped,
            skipped_branches: skipped,
            depth_limited,
            unsatisfiable,
        };
        info!(
            schema = %schema.id,
            coverage = options.coverage.as_str(),
            seed = options.seed,
            paths = report.paths.len(),
            truncated = report.truncated,
            skipped = report.skipped_branches.len(),
            "generated paths"
        );
        Ok(report)
    }
}

/// Minimal coverage: the first shortest path ending at each step, per
/// outcome. Generation order is kept.
fn shortest_per_terminal(paths: Vec<TestPath>) -> Vec<TestPath> {
    let mut best: BTreeMap<(String, Outcome), usize> = BTreeMap::new();
    for (i, path) in paths.iter().enumerate() {
        let key = (path.last_step().unwrap_or_default().to_string(), path.outcome);
        match best.get(&key) {
            Some(&j) if paths[j].len() <= path.len() => {}
            _ => {
                best.insert(key, i);
            }
        }
    }
    let keep: BTreeSet<usize> = best.into_values().collect();
    paths
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, p)| p)
        .collect()
}

// ──────────────────────────────────────────────
// Exploration
// ──────────────────────────────────────────────

/// A path prefix under construction.
#[derive(Debug, Clone)]
struct Partial {
    steps: Vec<String>,
    guards: BTreeMap<String, Rule>,
    decisions: BTreeMap<String, bool>,
    draft: Draft,
}

/// One way of leaving a step.
struct Branch<'s> {
    /// Coverage key: the transition taken, or `step->(none)`.
    key: String,
    /// (transition key, admission rule, required outcome)
    decisions: Vec<(String, Option<Rule>, bool)>,
    target: Option<&'s Transition>,
}

struct Explorer<'a> {
    schema: &'a UnifiedFormSchema,
    registry: &'a CustomRuleRegistry,
    options: &'a GenerationOptions,
    synth: DataSynth<'a>,
    navigator: Navigator<'a>,
    /// Fields read by any guard; left unset until a decision pins them.
    deferred: BTreeSet<String>,
    visited: BTreeSet<(String, Vec<(String, bool)>)>,
    covered: BTreeSet<String>,
    found: Vec<TestPath>,
    skipped: Vec<SkippedBranch>,
    depth_limited: usize,
    unsatisfiable: usize,
    capped: bool,
}

impl<'a> Explorer<'a> {
    fn new(
        schema: &'a UnifiedFormSchema,
        registry: &'a CustomRuleRegistry,
        options: &'a GenerationOptions,
    ) -> Self {
        let mut deferred = BTreeSet::new();
        let guards = schema
            .transitions
            .iter()
            .filter_map(|t| t.guard.as_ref())
            .chain(schema.steps.iter().filter_map(|s| s.guard.as_ref()));
        for guard in guards {
            deferred.extend(guard.referenced_fields().into_iter().map(str::to_string));
        }

        Explorer {
            schema,
            registry,
            options,
            synth: DataSynth::new(schema, registry),
            navigator: Navigator::new(schema, registry),
            deferred,
            visited: BTreeSet::new(),
            covered: BTreeSet::new(),
            found: Vec::new(),
            skipped: Vec::new(),
            depth_limited: 0,
            unsatisfiable: 0,
            capped: false,
        }
    }

    fn run(&mut self, rng: &mut StdRng) -> Result<(), GenerationError> {
        let schema = self.schema;
        let entry = schema.entry_step()?;
        let mut start = Partial {
            steps: vec![entry.id.clone()],
            guards: BTreeMap::new(),
            decisions: BTreeMap::new(),
            draft: Draft::new(),
        };
        if self.options.max_depth == 0 {
            self.depth_limited += 1;
            return Ok(());
        }
        if let Some(guard) = &entry.guard {
            self.synth.constrain(guard, true, &mut start.draft, rng);
            start.guards.insert(entry.id.clone(), guard.clone());
        }
        self.visit(start, rng);
        Ok(())
    }

    fn visit(&mut self, partial: Partial, rng: &mut StdRng) {
        if self.found.len() >= EXPLORATION_LIMIT {
            self.capped = true;
            return;
        }
        let Some(current) = partial.steps.last().cloned() else {
            return;
        };
        let state_key = (
            current.clone(),
            partial
                .decisions
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect::<Vec<_>>(),
        );
        if !self.visited.insert(state_key) {
            debug!(step = %current, "state already explored");
            return;
        }

        let schema = self.schema;
        let outgoing = schema.transitions_from(&current);
        if outgoing.is_empty() {
            self.finish(partial, Outcome::Success, rng);
            return;
        }

        let branches = self.branches(&current, &outgoing);
        for branch in self.select(branches, rng) {
            if self.capped {
                return;
            }
            self.follow(&partial, &current, branch, rng);
        }
    }

    fn branches<'s>(&self, current: &str, outgoing: &[&'s Transition]) -> Vec<Branch<'s>> {
        let rules: Vec<Option<Rule>> = outgoing
            .iter()
            .map(|t| admission_rule(self.schema, t))
            .collect();
        let mut out = Vec::with_capacity(outgoing.len() + 1);
        for (i, t) in outgoing.iter().enumerate() {
            let mut decisions: Vec<(String, Option<Rule>, bool)> = outgoing[..i]
                .iter()
                .zip(&rules)
                .map(|(prior, rule)| (prior.key(), rule.clone(), false))
                .collect();
            decisions.push((t.key(), rules[i].clone(), true));
            out.push(Branch {
                key: t.key(),
                decisions,
                target: Some(*t),
            });
            if rules[i].is_none() {
                // nothing after an unconditional transition is reachable
                return out;
            }
        }
        let blocked = outgoing
            .iter()
            .zip(&rules)
            .map(|(t, rule)| (t.key(), rule.clone(), false))
            .collect();
        out.push(Branch {
            key: format!("{}->(none)", current),
            decisions: blocked,
            target: None,
        });
        out
    }

    /// Coverage policy. Exhaustive and minimal take every branch;
    /// representative takes every branch not yet covered and samples the
    /// rest, keeping at least one.
    fn select<'s>(&self, branches: Vec<Branch<'s>>, rng: &mut StdRng) -> Vec<Branch<'s>> {
        match self.options.coverage {
            Coverage::Exhaustive | Coverage::Minimal => branches,
            Coverage::Representative => {
                let picks: Vec<bool> = branches
                    .iter()
                    .map(|b| !self.covered.contains(&b.key) || rng.gen_bool(0.5))
                    .collect();
                let fallback = if picks.iter().any(|p| *p) || branches.is_empty() {
                    None
                } else {
                    Some(rng.gen_range(0..branches.len()))
                };
                branches
                    .into_iter()
                    .zip(picks)
                    .enumerate()
                    .filter(|(i, (_, pick))| *pick || Some(*i) == fallback)
                    .map(|(_, (b, _))| b)
                    .collect()
            }
        }
    }

    fn follow(&mut self, partial: &Partial, current: &str, branch: Branch<'_>, rng: &mut StdRng) {
        let contradicts = branch.decisions.iter().any(|(key, _, want)| {
            partial
                .decisions
                .get(key)
                .is_some_and(|previous| previous != want)
        });
        if contradicts {
            debug!(step = current, branch = %branch.key, "branch contradicts earlier decisions");
            self.unsatisfiable += 1;
            return;
        }

        let mut next = partial.clone();
        let rules: Vec<(&Rule, bool)> = branch
            .decisions
            .iter()
            .filter_map(|(_, rule, want)| rule.as_ref().map(|r| (r, *want)))
            .collect();
        if let Some(step) = self.schema.step(current) {
            self.synth
                .generate_step_data(step, &rules, &mut next.draft, &self.deferred, rng);
        }

        match self.check(&rules, &next.draft) {
            Ok(true) => {}
            Ok(false) => {
                debug!(step = current, branch = %branch.key, "no data realizes branch");
                self.unsatisfiable += 1;
                return;
            }
            Err(e) => {
                self.skip(current, &branch.key, &e);
                return;
            }
        }

        for (key, _, want) in &branch.decisions {
            next.decisions.insert(key.clone(), *want);
        }
        self.covered.insert(branch.key.clone());

        match branch.target {
            Some(t) => {
                if next.steps.len() >= self.options.max_depth {
                    debug!(step = current, "path cut at max depth");
                    self.depth_limited += 1;
                    return;
                }
                next.steps.push(t.target.clone());
                if let Some(rule) = branch.decisions.last().and_then(|(_, r, _)| r.clone()) {
                    next.guards.insert(t.target.clone(), rule);
                }
                self.visit(next, rng);
            }
            None => self.finish(next, Outcome::Blocked, rng),
        }
    }

    fn check(&self, rules: &[(&Rule, bool)], draft: &Draft) -> Result<bool, RuleError> {
        for (rule, want) in rules {
            if evaluate(rule, &draft.data, self.registry)? != *want {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn skip(&mut self, step: &str, transition: &str, error: &RuleError) {
        warn!(step, transition, error = %error, "skipping branch");
        self.skipped.push(SkippedBranch {
            step: step.to_string(),
            transition: transition.to_string(),
            reason: error.to_string(),
        });
    }

    /// Fill the remaining fields, replay, and keep the path if the replay
    /// agrees with it.
    fn finish(&mut self, partial: Partial, outcome: Outcome, rng: &mut StdRng) {
        let Partial {
            mut steps,
            mut guards,
            mut draft,
            ..
        } = partial;
        let none = BTreeSet::new();
        let mut seen = BTreeSet::new();
        for id in &steps {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(step) = self.schema.step(id) {
                self.synth.fill(step, &mut draft, &none, rng);
            }
        }
        let data = draft.into_data();

        let last = steps.last().cloned().unwrap_or_default();
        match self.navigator.confirms(&steps, &data, outcome) {
            Ok(true) => {}
            Ok(false) => {
                warn!(step = %last, outcome = outcome.as_str(), "dropping path whose data diverges on replay");
                self.unsatisfiable += 1;
                return;
            }
            Err(e) => {
                self.skip(&last, "(replay)", &e);
                return;
            }
        }

        let outcome = match self.navigator.first_invalid_step(&steps, &data) {
            Some(i) => {
                steps.truncate(i + 1);
                let visited: BTreeSet<&String> = steps.iter().collect();
                guards.retain(|id, _| visited.contains(id));
                Outcome::ValidationError
            }
            None => outcome,
        };

        self.found.push(TestPath {
            id: String::new(),
            steps,
            guards,
            data,
            outcome,
        });
    }
}
