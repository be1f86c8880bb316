//! The `gradebook init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("gradebook.toml").exists() {
        println!("gradebook.toml already exists, skipping.");
    } else {
        std::fs::write("gradebook.toml", SAMPLE_CONFIG)?;
        println!("Created gradebook.toml");
    }

    std::fs::create_dir_all("datasets")?;
    let example_path = std::path::Path::new("datasets/example.toml");
    if example_path.exists() {
        println!("datasets/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_DATASET)?;
        println!("Created datasets/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: gradebook validate --dataset datasets/example.toml");
    println!("  2. Run: gradebook averages --dataset datasets/example.toml --teacher t1 --class math");
    println!("  3. Run: gradebook top --dataset datasets/example.toml --teacher t1 --class math");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradebook configuration

parallelism = 4
unit_timeout_ms = 2000
student_timeout_ms = 10000
max_grade = 10.0
default_top_count = 3
output_dir = "./gradebook-reports"
"#;

const EXAMPLE_DATASET: &str = r#"# Example gradebook dataset

[[classes]]
id = "math"
name = "Mathematics"
teacher_id = "t1"
averaging_mode = "simple"

[[classes.units]]
id = "algebra"
name = "Algebra"
averaging_mode = "simple"

[[classes.units.items]]
id = "algebra-t1"
name = "Test 1"

[[classes.units.items]]
id = "algebra-t2"
name = "Test 2"

[[classes.units]]
id = "geometry"
name = "Geometry"
averaging_mode = "personalized"
formula = "N1*0.3 + N2*0.7"

[[classes.units.items]]
id = "geometry-quiz"
name = "Quiz"

[[classes.units.items]]
id = "geometry-project"
name = "Project"

[[classes.students]]
id = "ana"
name = "Ana Lima"
registration = "2024001"

[[classes.students]]
id = "bruno"
name = "Bruno Costa"
registration = "2024002"

[[classes.students]]
id = "carla"
name = "Carla Dias"
registration = "2024003"

[[classes.grades]]
student = "ana"
item = "algebra-t1"
value = 8.0

[[classes.grades]]
student = "ana"
item = "algebra-t2"
value = 6.0

[[classes.grades]]
student = "ana"
item = "geometry-quiz"
value = 10.0

[[classes.grades]]
student = "ana"
item = "geometry-project"
value = 5.0

[[classes.grades]]
student = "bruno"
item = "algebra-t1"
value = 9.0

[[classes.grades]]
student = "bruno"
item = "geometry-quiz"
value = 7.0

[[classes.grades]]
student = "bruno"
item = "geometry-project"
value = 9.0
comment = "excellent model"

[[classes.grades]]
student = "carla"
item = "algebra-t2"
value = 5.0

[[classes.grades]]
student = "carla"
item = "geometry-project"
value = 6.0
"#;
