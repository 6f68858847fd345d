use std::fmt;

use edu_core::model::{Account, Lesson, Role};
use services::{
    AppConfig, AppServices, Clock, CourseDraft, IdentityError, IdentityService, PendingUpload,
};
use tracing::info;
use tracing_subscriber::{fmt as log_fmt, prelude::*};

const SEED_PASSWORD: &str = "password";

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    educators: u32,
    courses: u32,
    students: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCount { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCount { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_count(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse::<u32>()
        .map_err(|_| ArgsError::InvalidCount { flag, raw: value })
}

impl Args {
    fn parse(config: &AppConfig) -> Result<Self, ArgsError> {
        let mut db_url = config.database_url.clone();
        let mut educators = 2;
        let mut courses = 3;
        let mut students = 4;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--educators" => educators = parse_count(&mut args, "--educators")?,
                "--courses" => courses = parse_count(&mut args, "--courses")?,
                "--students" => students = parse_count(&mut args, "--students")?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            educators,
            courses,
            students,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p services --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: EDU_DB_URL or sqlite://edu.sqlite3?mode=rwc)");
    eprintln!("  --educators <n>           Educator accounts to create (default: 2)");
    eprintln!("  --courses <n>             Courses per educator (default: 3)");
    eprintln!("  --students <n>            Student accounts to create (default: 4)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EDU_DB_URL, EDU_LOG");
    eprintln!();
    eprintln!("Every seeded account uses the password \"{SEED_PASSWORD}\".");
}

/// Sign up, or sign in when the account already exists from an earlier run.
async fn ensure_account(
    identity: &IdentityService,
    email: &str,
    name: &str,
    role: Role,
) -> Result<Account, IdentityError> {
    match identity.signup(email, SEED_PASSWORD, name, role).await {
        Err(IdentityError::EmailTaken) => identity.login(email, SEED_PASSWORD).await,
        other => other,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(log_fmt::layer())
        .init();

    let args = Args::parse(&config).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = AppConfig {
        database_url: args.db_url.clone(),
        ..config
    };
    let app = AppServices::from_config(&config, Clock::default()).await?;
    let identity = app.identity();
    let courses = app.courses();
    let enrollments = app.enrollments();
    let lessons = app.lessons();

    let mut catalogue = Vec::new();
    for e in 1..=args.educators {
        let educator = ensure_account(
            &identity,
            &format!("educator{e}@example.com"),
            &format!("Educator {e}"),
            Role::Educator,
        )
        .await?;

        let existing = courses.list_by_educator(educator.id()).await?;
        if !existing.is_empty() {
            catalogue.extend(existing);
            continue;
        }

        for c in 1..=args.courses {
            let draft = CourseDraft {
                title: format!("Course {c} by {}", educator.name()),
                description: format!("Sample course {c}."),
                duration: format!("{} weeks", c + 1),
                lessons: (c * 2).to_string(),
                thumbnail: None,
                materials: vec![PendingUpload::from_bytes(
                    "syllabus.txt",
                    "text/plain",
                    format!("Syllabus for course {c}").into_bytes(),
                )],
            };
            catalogue.push(courses.create(educator.id(), educator.name(), draft).await?);
        }
    }

    for s in 1..=args.students {
        let student = ensure_account(
            &identity,
            &format!("student{s}@example.com"),
            &format!("Student {s}"),
            Role::Student,
        )
        .await?;

        // Every other course, offset per student, with the first lesson done.
        let skip = usize::try_from(s % 2).unwrap_or(0);
        for course in catalogue.iter().skip(skip).step_by(2) {
            enrollments.enroll(student.id(), course.id()).await?;
            let mut open = lessons.open(student.id(), course.id()).await?;
            let first_open = open
                .lessons()
                .first()
                .filter(|l| !l.is_completed())
                .map(Lesson::id);
            if let Some(first) = first_open {
                lessons.toggle_lesson(&mut open, &first).await?;
            }
        }
    }

    identity.logout().await?;
    info!(
        educators = args.educators,
        courses = catalogue.len(),
        students = args.students,
        db_url = %args.db_url,
        "seed complete"
    );
    println!(
        "Seeded {} educators, {} courses and {} students into {}",
        args.educators,
        catalogue.len(),
        args.students,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
