use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medminder::config::Config;
use medminder::error::{MedMinderError, Result};
use medminder::interfaces::platform::NullPlatform;
use medminder::providers::disk::DiskStorage;
use medminder::repository::MedicationRepository;
use medminder::schedule;

#[derive(Parser, Debug)]
#[command(name = "medminder")]
#[command(about = "Medication reminder engine")]
struct Cli {
    /// Path to a JSON config file
    #[arg(long)]
    config: Option<String>,

    /// Data directory for the JSON collection blobs
    #[arg(long, env = "MEDMINDER_DATA_DIR")]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a medication
    AddMedication {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List medications, earliest schedule time first
    ListMedications,
    /// Delete a medication along with its schedules and intakes
    DeleteMedication { id: i64 },
    /// Add a recurring schedule: time as "HH:MM", days as "1,3,5" (1 = Monday)
    AddSchedule {
        medication_id: i64,
        time: String,
        days: String,
    },
    /// List schedules sorted by time
    ListSchedules,
    /// Delete a schedule along with its intakes
    DeleteSchedule { id: i64 },
    /// Record today's dose for a schedule as taken
    Take { schedule_id: i64 },
    /// Show doses due today that are past the grace window
    Due,
    /// Show reminders that are currently due
    Reminders,
    /// Acknowledge a reminder
    Acknowledge { reminder_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,medminder=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir());

    let storage = Arc::new(DiskStorage::new(data_dir)?);
    let repo = MedicationRepository::new(storage, Arc::new(NullPlatform)).await;

    match cli.command {
        Commands::AddMedication { name, description } => {
            let id = repo
                .insert_medication(&name, description.as_deref())
                .await?;
            println!("added medication {id}: {name}");
        }
        Commands::ListMedications => {
            for medication in repo.get_all_medications() {
                let description = medication.description.unwrap_or_default();
                println!("{:>4}  {}  {}", medication.id, medication.name, description);
            }
        }
        Commands::DeleteMedication { id } => {
            repo.delete_medication(id).await?;
            println!("deleted medication {id}");
        }
        Commands::AddSchedule {
            medication_id,
            time,
            days,
        } => {
            schedule::parse_time(&time)?;
            schedule::parse_days_of_week(&days)?;
            let id = repo.insert_schedule(medication_id, &time, &days).await?;
            println!("added schedule {id}: medication {medication_id} at {time} on {days}");
        }
        Commands::ListSchedules => {
            for s in repo.get_all_schedules() {
                println!(
                    "{:>4}  medication {}  {}  days {}",
                    s.id, s.medication_id, s.time, s.days_of_week
                );
            }
        }
        Commands::DeleteSchedule { id } => {
            repo.delete_schedule(id).await?;
            println!("deleted schedule {id}");
        }
        Commands::Take { schedule_id } => {
            let s = repo
                .get_schedule_by_id(schedule_id)
                .ok_or_else(|| MedMinderError::Runtime(format!("no schedule {schedule_id}")))?;
            let today = schedule::date_string(schedule::local_date_of(schedule::now_ts()));
            let id = repo
                .record_intake(s.medication_id, s.id, &s.time, &today, true)
                .await?;
            println!("recorded intake {id} for schedule {schedule_id} on {today}");
        }
        Commands::Due => {
            let now = schedule::now_ts();
            let overdue = repo.get_medications_not_taken_for_today(now);
            if overdue.is_empty() {
                println!("nothing overdue");
            } else {
                for (medication, s) in &overdue {
                    println!("{}  {} (schedule {})", s.time, medication.name, s.id);
                }
            }
            repo.update_badge(now);
        }
        Commands::Reminders => {
            let now = schedule::now_ts();
            for reminder in repo.get_active_reminders(now) {
                let name = repo
                    .get_medication_by_id(reminder.medication_id)
                    .map(|m| m.name)
                    .unwrap_or_else(|| format!("medication {}", reminder.medication_id));
                println!(
                    "{:>4}  {}  {} {}",
                    reminder.id, name, reminder.scheduled_date, reminder.scheduled_time
                );
            }
        }
        Commands::Acknowledge { reminder_id } => {
            repo.acknowledge_reminder(reminder_id).await?;
            println!("acknowledged reminder {reminder_id}");
        }
    }

    Ok(())
}
