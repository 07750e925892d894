use super::parser::{ScheduledSample, Stmt};
use super::{lexer, parser, MAX_BUCKETS, MIN_BUCKETS, ScriptError};
use crate::hypothesis::{HypothesisData, ListHypothesisData, SackSlot};
use crate::model::distribution::Distribution;
use crate::model::instruction::AnimationInstruction;
use crate::model::list::{ListId, SackList};
use crate::model::schedule::{SamplingSchedule, ScheduleEntry};
use crate::model::template::{Template, TemplateId};
use crate::rng::{DEFAULT_SEED, Lcg};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything one script execution produced. Partial when `errors` is
/// non-empty: whatever was collected before the fault is still here for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub templates: Vec<Template>,
    pub lists: Vec<SackList>,
    pub instructions: Vec<AnimationInstruction>,
    pub schedule: SamplingSchedule,
    pub hypothesis_data: HypothesisData,
    pub ball_count: usize,
    pub bucket_count: Option<u32>,
    pub errors: Vec<ScriptError>,
}

impl ScriptOutput {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn template_by_id(&self, id: &TemplateId) -> Option<&Template> {
        self.templates.iter().find(|t| t.id() == id)
    }

    pub fn template_by_name(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name() == name)
    }
}

/// Executes scenario scripts. One engine value is reusable; every
/// `execute` call owns fresh scratch state and discards it on return.
#[derive(Debug, Clone)]
pub struct ScriptEngine {
    seed: u64,
}

impl ScriptEngine {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Synchronous single-pass execution. Side effects (instructions,
    /// template registrations) are recorded in occurrence order; schedule
    /// references resolve only after the whole script has run, so forward
    /// references by name are legal.
    pub fn execute(&self, source: &str) -> ScriptOutput {
        let mut ctx = EvalContext::new(self.seed);

        match lexer::tokenize(source).and_then(|tokens| parser::parse(&tokens)) {
            Ok(statements) => {
                for stmt in &statements {
                    if let Err(err) = ctx.eval(stmt) {
                        ctx.errors.push(err);
                        break;
                    }
                }
            }
            Err(err) => ctx.errors.push(err),
        }

        ctx.finish()
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

struct ListSlot {
    id: ListId,
    list: Option<SackList>,
}

/// Explicit evaluator state threaded through every statement handler.
struct EvalContext {
    rng: Lcg,
    slots: Vec<ListSlot>,
    bindings: HashMap<String, usize>,
    templates: Vec<Template>,
    export_index: HashMap<String, usize>,
    instructions: Vec<AnimationInstruction>,
    raw_schedule: Vec<(ScheduledSample, u32)>,
    bucket_count: Option<u32>,
    errors: Vec<ScriptError>,
}

impl EvalContext {
    fn new(seed: u64) -> Self {
        Self {
            rng: Lcg::new(seed),
            slots: Vec::new(),
            bindings: HashMap::new(),
            templates: Vec::new(),
            export_index: HashMap::new(),
            instructions: Vec::new(),
            raw_schedule: Vec::new(),
            bucket_count: None,
            errors: Vec::new(),
        }
    }

    fn eval(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::LetList { name, line } => self.eval_let(name, *line),
            Stmt::Define {
                list,
                distributions,
                line,
            } => self.eval_define(list, distributions, *line),
            Stmt::Permute { list, line } => self.eval_permute(list, *line),
            Stmt::Export {
                name,
                list,
                index,
                for_betting,
                line,
            } => self.eval_export(name, list, *index, *for_betting, *line),
            Stmt::Schedule { samples, line } => {
                for sample in samples {
                    self.raw_schedule.push((sample.clone(), *line));
                }
                Ok(())
            }
            Stmt::Buckets { value, line } => self.eval_buckets(*value, *line),
        }
    }

    fn eval_let(&mut self, name: &str, line: u32) -> Result<(), ScriptError> {
        if self.bindings.contains_key(name) {
            return Err(ScriptError::new(
                format!("duplicate list binding '{name}'"),
                line,
            ));
        }
        let slot = self.slots.len();
        self.slots.push(ListSlot {
            id: ListId::from_index(slot + 1),
            list: None,
        });
        self.bindings.insert(name.to_string(), slot);
        Ok(())
    }

    fn eval_define(
        &mut self,
        name: &str,
        distributions: &[Distribution],
        line: u32,
    ) -> Result<(), ScriptError> {
        let slot = self.slot_index(name, line)?;
        if self.slots[slot].list.is_some() {
            return Err(ScriptError::new(
                format!("define() called twice on '{name}'"),
                line,
            ));
        }
        let id = self.slots[slot].id.clone();
        self.slots[slot].list = Some(SackList::new(id.clone(), distributions.to_vec()));
        self.instructions.push(AnimationInstruction::Define {
            list_id: id,
            distributions: distributions.to_vec(),
        });
        Ok(())
    }

    fn eval_permute(&mut self, name: &str, line: u32) -> Result<(), ScriptError> {
        let slot = self.slot_index(name, line)?;
        let list = self.slots[slot].list.as_mut().ok_or_else(|| {
            ScriptError::new(format!("permute() called before define() on '{name}'"), line)
        })?;
        let swaps = list.permute(&mut self.rng);
        self.instructions.push(AnimationInstruction::Permute {
            list_id: list.id().clone(),
            swaps,
        });
        Ok(())
    }

    fn eval_export(
        &mut self,
        export_name: &str,
        list_name: &str,
        index: i64,
        for_betting: bool,
        line: u32,
    ) -> Result<(), ScriptError> {
        if self.export_index.contains_key(export_name) {
            return Err(ScriptError::new(
                format!("duplicate export name '{export_name}'"),
                line,
            ));
        }

        let slot = self.slot_index(list_name, line)?;
        let list = self.slots[slot].list.as_mut().ok_or_else(|| {
            ScriptError::new(
                format!("select() called before define() on '{list_name}'"),
                line,
            )
        })?;

        let position = usize::try_from(index)
            .map_err(|_| ScriptError::new(format!("select({index}) is out of bounds"), line))?;
        let distribution = list
            .select(position)
            .map_err(|err| ScriptError::new(err.to_string(), line))?;

        let template_id = TemplateId::from_index(self.templates.len() + 1);
        self.instructions.push(AnimationInstruction::Select {
            list_id: list.id().clone(),
            index: position,
            template_id: template_id.clone(),
        });

        let list_id = list.id().clone();
        self.export_index
            .insert(export_name.to_string(), self.templates.len());
        self.templates.push(Template::new(
            template_id,
            export_name,
            distribution,
            list_id,
            position,
            for_betting,
        ));
        Ok(())
    }

    fn eval_buckets(&mut self, value: i64, line: u32) -> Result<(), ScriptError> {
        if self.bucket_count.is_some() {
            return Err(ScriptError::new("buckets() declared twice", line));
        }
        if !(MIN_BUCKETS..=MAX_BUCKETS).contains(&value) {
            return Err(ScriptError::new(
                "buckets() requires a number between 2 and 10",
                line,
            ));
        }
        self.bucket_count = Some(value as u32);
        Ok(())
    }

    fn slot_index(&self, name: &str, line: u32) -> Result<usize, ScriptError> {
        self.bindings
            .get(name)
            .copied()
            .ok_or_else(|| ScriptError::new(format!("unknown identifier '{name}'"), line))
    }

    /// Post-run phase: schedule resolution, whole-script validation, and
    /// assembly of the (possibly partial) output.
    fn finish(mut self) -> ScriptOutput {
        let mut schedule = SamplingSchedule::new();
        if self.errors.is_empty() {
            for (sample, line) in &self.raw_schedule {
                let name = sample.sack.name();
                match self.export_index.get(name) {
                    Some(&index) => {
                        let template = &self.templates[index];
                        schedule.push(ScheduleEntry {
                            sack_name: template.name().to_string(),
                            template_id: template.id().clone(),
                            time: sample.time,
                        });
                    }
                    None => {
                        self.errors.push(ScriptError::new(
                            format!("schedule() references unknown sack '{name}'"),
                            *line,
                        ));
                        schedule = SamplingSchedule::new();
                        break;
                    }
                }
            }
        }

        if self.bucket_count.is_none()
            && !self
                .errors
                .iter()
                .any(|e| e.message.contains("buckets()"))
        {
            self.errors.push(ScriptError::new(
                "buckets() requires a number between 2 and 10",
                0,
            ));
        }

        let lists: Vec<SackList> = self
            .slots
            .into_iter()
            .filter_map(|slot| slot.list)
            .collect();
        let hypothesis_data = build_hypothesis_data(&lists, &self.templates);
        let ball_count = schedule.len();

        ScriptOutput {
            templates: self.templates,
            lists,
            instructions: self.instructions,
            schedule,
            hypothesis_data,
            ball_count,
            bucket_count: self.bucket_count,
            errors: self.errors,
        }
    }
}

fn build_hypothesis_data(lists: &[SackList], templates: &[Template]) -> HypothesisData {
    let mut data = HypothesisData { lists: Vec::new() };
    for list in lists {
        let list_templates: Vec<&Template> = templates
            .iter()
            .filter(|t| t.list_id() == list.id())
            .collect();
        if list_templates.is_empty() {
            continue;
        }
        // Exports and selections are recorded pairwise in script order;
        // the recorded source index is the ground truth even if the list
        // is permuted again later.
        debug_assert_eq!(list_templates.len(), list.selections().len());
        let slots: Vec<SackSlot> = list_templates
            .iter()
            .zip(list.selections())
            .map(|(template, selection)| SackSlot {
                template_name: template.name().to_string(),
                source_index: selection.source_index,
                for_betting: template.for_betting(),
            })
            .collect();
        data.lists.push(ListHypothesisData {
            list_id: list.id().clone(),
            size: list.len(),
            distributions: list.distributions().to_vec(),
            slots,
        });
    }
    data
}

#[cfg(test)]
mod tests {
    use super::ScriptEngine;
    use crate::model::color::Color;
    use crate::model::instruction::AnimationInstruction;

    const FULL_SCRIPT: &str = r#"
let bag = list()
bag.define([{red: 70, blue: 30}, {red: 30, blue: 70}])
bag.permute()
export left = bag.select(0) for betting
export right = bag.select(1)
schedule([(left, 1.0), ("right", 2.5)])
buckets(4)
"#;

    #[test]
    fn full_script_executes_cleanly() {
        let output = ScriptEngine::new(7).execute(FULL_SCRIPT);
        assert!(output.is_clean(), "errors: {:?}", output.errors);
        assert_eq!(output.templates.len(), 2);
        assert_eq!(output.ball_count, 2);
        assert_eq!(output.bucket_count, Some(4));
        assert_eq!(output.schedule.entries()[0].sack_name, "left");
        assert_eq!(output.schedule.entries()[1].time, 2.5);
    }

    #[test]
    fn instructions_keep_define_permute_select_order() {
        let output = ScriptEngine::new(7).execute(FULL_SCRIPT);
        let phases: Vec<&'static str> = output
            .instructions
            .iter()
            .map(|i| match i {
                AnimationInstruction::Define { .. } => "define",
                AnimationInstruction::Permute { .. } => "permute",
                AnimationInstruction::Select { .. } => "select",
            })
            .collect();
        assert_eq!(phases, ["define", "permute", "select", "select"]);
    }

    #[test]
    fn permute_instruction_reconstructs_the_selection() {
        use crate::model::instruction::apply_swaps;
        let output = ScriptEngine::new(11).execute(FULL_SCRIPT);
        let list = &output.lists[0];
        let swaps = output
            .instructions
            .iter()
            .find_map(|i| match i {
                AnimationInstruction::Permute { swaps, .. } => Some(swaps.as_slice()),
                _ => None,
            })
            .unwrap();
        assert_eq!(apply_swaps(list.len(), swaps), list.current_order());
        let left = output.template_by_name("left").unwrap();
        assert_eq!(
            left.distribution(),
            &list.distributions()[list.current_order()[0]]
        );
    }

    #[test]
    fn exported_template_is_a_copy_of_the_selection() {
        let output = ScriptEngine::new(3).execute(FULL_SCRIPT);
        let left = output.template_by_name("left").unwrap();
        let total: u32 = Color::ALL.iter().map(|c| left.distribution().count(*c)).sum();
        assert_eq!(total, 100);
        assert!(left.for_betting());
        assert!(!output.template_by_name("right").unwrap().for_betting());
    }

    #[test]
    fn same_seed_reproduces_the_permutation() {
        let a = ScriptEngine::new(99).execute(FULL_SCRIPT);
        let b = ScriptEngine::new(99).execute(FULL_SCRIPT);
        assert_eq!(a.lists[0].current_order(), b.lists[0].current_order());
        assert_eq!(a.instructions, b.instructions);
    }

    #[test]
    fn select_out_of_bounds_halts_with_partial_results() {
        let source = r#"
let bag = list()
bag.define([{red: 1}])
export a = bag.select(0)
export b = bag.select(3)
buckets(2)
"#;
        let output = ScriptEngine::default().execute(source);
        assert_eq!(output.errors.len(), 2, "halt error plus missing buckets");
        assert!(output.errors[0].message.contains("out of bounds"));
        assert_eq!(output.errors[0].line, 5);
        // The first export survived the halt.
        assert_eq!(output.templates.len(), 1);
        assert_eq!(output.bucket_count, None);
    }

    #[test]
    fn select_before_define_is_an_error() {
        let source = "let bag = list()\nexport a = bag.select(0)\nbuckets(2)";
        let output = ScriptEngine::default().execute(source);
        assert!(
            output.errors[0]
                .message
                .contains("select() called before define() on 'bag'")
        );
        assert_eq!(output.errors[0].line, 2);
    }

    #[test]
    fn duplicate_export_name_is_an_error() {
        let source = r#"
let bag = list()
bag.define([{red: 1}, {blue: 1}])
export a = bag.select(0)
export a = bag.select(1)
buckets(2)
"#;
        let output = ScriptEngine::default().execute(source);
        assert!(output.errors[0].message.contains("duplicate export name 'a'"));
    }

    #[test]
    fn unknown_schedule_reference_is_fatal() {
        let source = r#"
let bag = list()
bag.define([{red: 1}])
export a = bag.select(0)
schedule([("ghost", 1.0)])
buckets(2)
"#;
        let output = ScriptEngine::default().execute(source);
        assert!(
            output.errors[0]
                .message
                .contains("schedule() references unknown sack 'ghost'")
        );
        assert!(output.schedule.is_empty());
        assert_eq!(output.ball_count, 0);
    }

    #[test]
    fn forward_reference_by_name_is_legal() {
        let source = r#"
let bag = list()
bag.define([{red: 1}, {blue: 1}])
schedule([("later", 0.5)])
export later = bag.select(0)
buckets(2)
"#;
        let output = ScriptEngine::default().execute(source);
        assert!(output.is_clean(), "errors: {:?}", output.errors);
        assert_eq!(output.schedule.entries()[0].sack_name, "later");
    }

    #[test]
    fn buckets_out_of_range_matches_the_contract() {
        let output = ScriptEngine::default().execute("buckets(11)");
        assert_eq!(
            output.errors[0].message,
            "buckets() requires a number between 2 and 10"
        );
        assert!(output.templates.is_empty());
    }

    #[test]
    fn missing_buckets_is_a_validation_error() {
        let source = "let bag = list()\nbag.define([{red: 1}])\nexport a = bag.select(0)";
        let output = ScriptEngine::default().execute(source);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(
            output.errors[0].message,
            "buckets() requires a number between 2 and 10"
        );
        assert_eq!(output.errors[0].line, 0);
    }

    #[test]
    fn schedule_round_trips_names_and_times() {
        let source = r#"
let bag = list()
bag.define([{red: 1}, {blue: 1}, {green: 1}])
export a = bag.select(0)
export b = bag.select(1)
schedule([(a, 0.5), (b, 1.5), ("a", 3.0)])
buckets(3)
"#;
        let output = ScriptEngine::default().execute(source);
        assert!(output.is_clean());
        let pairs: Vec<(&str, f64)> = output
            .schedule
            .iter()
            .map(|e| (e.sack_name.as_str(), e.time))
            .collect();
        assert_eq!(pairs, [("a", 0.5), ("b", 1.5), ("a", 3.0)]);
        assert_eq!(output.ball_count, 3);
    }

    #[test]
    fn hypothesis_data_reflects_selections() {
        let output = ScriptEngine::new(5).execute(FULL_SCRIPT);
        let data = &output.hypothesis_data;
        assert_eq!(data.lists.len(), 1);
        let list = &data.lists[0];
        assert_eq!(list.size, 2);
        assert_eq!(list.slots.len(), 2);
        assert_eq!(list.slots[0].template_name, "left");
        assert_ne!(list.slots[0].source_index, list.slots[1].source_index);
    }
}
