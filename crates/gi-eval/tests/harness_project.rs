//! Harness Integration Tests
//!
//! Whole-project evaluations: a descriptor on disk, a real shell program,
//! scratch staging and fitness parsing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gi_eval::{Evaluator, FitnessSpec, Harness, ProjectDescriptor, Stage, Status};
use gi_program::{Edit, EditKind, LineEngine, Patch, Program, Target};
use gi_test_utils::{temp_project, TempProject};
use pretty_assertions::assert_eq;

const BENCH: &str = "\
n=$1
echo \"cost: $n\"
echo \"[RESULT] {runtime: $n, instance: $n}\"
";

fn harness(project: &TempProject) -> Harness<LineEngine> {
    let descriptor = ProjectDescriptor::load(&project.descriptor_path()).unwrap();
    let program = Program::load(LineEngine, project.path(), &descriptor.target_files).unwrap();
    Harness::new(Arc::new(program), descriptor, project.path()).unwrap()
}

fn tagged(run: &str) -> ProjectDescriptor {
    let mut descriptor = ProjectDescriptor::new(vec!["bench.sh".into()], run);
    descriptor.fitness = FitnessSpec::Tagged {
        marker: "[RESULT]".into(),
        key: "runtime".into(),
    };
    descriptor.scratch_dir = Some("scratch".into());
    descriptor
}

#[test]
fn test_descriptor_round_trips_through_disk() {
    let mut descriptor = tagged("sh bench.sh {instance}");
    descriptor.instances = vec!["1".into(), "2".into()];
    descriptor.oracle = true;
    let project = temp_project(&[("bench.sh", BENCH)], &descriptor);

    assert_eq!(ProjectDescriptor::load(&project.descriptor_path()).unwrap(), descriptor);

    let json = project.path().join("gi.json");
    std::fs::write(&json, serde_json::to_string(&descriptor).unwrap()).unwrap();
    assert_eq!(ProjectDescriptor::load(&json).unwrap(), descriptor);
}

#[tokio::test]
async fn test_instances_sum_tagged_fitness() {
    let mut descriptor = tagged("sh bench.sh {instance}");
    descriptor.instances = vec!["2".into(), "5".into()];
    let project = temp_project(&[("bench.sh", BENCH)], &descriptor);
    let mut harness = harness(&project);

    let evaluation = harness.evaluate(&Patch::new()).await;
    assert_eq!(evaluation.status, Status::Normal);
    assert_eq!(evaluation.fitness, Some(7.0));

    // Dropping the block leaves nothing to parse.
    let patch = Patch::from(vec![Edit::delete(Target::new("bench.sh", 2))]);
    let evaluation = harness.evaluate(&patch).await;
    assert_eq!(evaluation.status, Status::ParseError);
    assert_eq!(evaluation.stage, Some(Stage::Run));

    harness.cleanup().unwrap();
    assert!(!project.path().join("scratch").exists());
    assert_eq!(project.read("bench.sh"), BENCH);
}

#[tokio::test]
async fn test_counter_after_compile_step() {
    let mut descriptor = ProjectDescriptor::new(vec!["bench.sh".into()], "sh built.sh 3");
    descriptor.compile_command = Some("cp bench.sh built.sh".into());
    descriptor.fitness = FitnessSpec::Counter { name: "cost".into() };
    descriptor.scratch_dir = Some("scratch".into());
    let project = temp_project(&[("bench.sh", BENCH)], &descriptor);
    let mut harness = harness(&project);

    assert_eq!(harness.evaluate(&Patch::new()).await.fitness, Some(3.0));

    // Echoing the cost line twice keeps the first match.
    let patch = Patch::from(vec![Edit::with_ingredient(
        EditKind::InsertBefore,
        Target::new("bench.sh", 2),
        Target::new("bench.sh", 1),
    )]);
    let evaluation = harness.evaluate(&patch).await;
    assert_eq!(evaluation.fitness, Some(3.0));
    assert!(harness.cache().contains(&patch.signature()).await);
}

#[tokio::test]
async fn test_runaway_program_times_out() {
    let mut descriptor = ProjectDescriptor::new(vec!["slow.sh".into()], "sh slow.sh");
    descriptor.run_timeout_secs = 0.5;
    descriptor.scratch_dir = Some("scratch".into());
    let project = temp_project(&[("slow.sh", "sleep 30\n")], &descriptor);
    let mut harness = harness(&project);

    let started = Instant::now();
    let evaluation = harness.evaluate(&Patch::new()).await;
    assert_eq!(evaluation.status, Status::TimeOut);
    assert_eq!(evaluation.stage, Some(Stage::Run));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_oracle_rejects_changed_verdicts() {
    let mut descriptor = ProjectDescriptor::new(vec!["check.sh".into()], "sh check.sh {instance}");
    descriptor.instances = vec!["a".into(), "b".into()];
    descriptor.success_code = 10;
    descriptor.oracle = true;
    descriptor.fitness = FitnessSpec::PassFail;
    descriptor.scratch_dir = Some("scratch".into());
    // Instance "a" passes with exit code 10, "b" fails.
    let script = "[ \"$1\" = a ] && exit 10\nexit 20\n";
    let project = temp_project(&[("check.sh", script)], &descriptor);
    let mut harness = harness(&project);

    let evaluation = harness.evaluate(&Patch::new()).await;
    assert_eq!(evaluation.status, Status::Normal);
    assert_eq!(evaluation.fitness, Some(1.0));
    assert_eq!(harness.truth_table().len(), 2);

    // Without the first line both instances fail, so "a" diverges.
    let evaluation = harness.evaluate(&Patch::from(vec![Edit::delete(Target::new("check.sh", 0))])).await;
    assert_eq!(evaluation.status, Status::ParseError);
    assert_eq!(evaluation.stage, Some(Stage::Fail));
}
