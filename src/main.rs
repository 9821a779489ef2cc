use anyhow::Context;
use clap::Parser;
use class_attendance::cli::{Cli, Command};
use class_attendance::{AttendanceManager, Settings, display, web};
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config).context("failed to load settings")?;
    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }

    let filter =
        EnvFilter::try_new(&settings.log.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut manager = AttendanceManager::connect(&settings.database.url)
        .with_context(|| format!("failed to open database {}", settings.database.url))?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }

            let address = settings.bind_address();
            let app = web::router(web::AppState::new(manager));

            let listener = tokio::net::TcpListener::bind(&address)
                .await
                .with_context(|| format!("failed to bind {address}"))?;
            info!(database = %settings.database.url, "listening on {address}");

            axum::serve(listener, app).await?;
        }
        Command::CreateClass { name } => match manager.create_class(&name)? {
            Some(class) => println!("Created class {} ({})", class.name, class.id),
            None => println!("Class name was blank, nothing created."),
        },
        Command::ListClasses => {
            let classes = manager.list_classes()?;
            println!("Classes:\n{}", display::classes_table(&classes));
        }
        Command::AddStudent { class_id, name } => match manager.add_student(class_id, &name)? {
            Some(student) => {
                println!("Added {} ({}) to class {class_id}", student.name, student.id)
            }
            None => println!("Student name was blank, nothing added."),
        },
        Command::ShowClass { class_id } => {
            let overview = manager.class_overview(class_id)?;
            println!("{}", display::class_table(&overview));
        }
        Command::Mark { class_id, present } => {
            let records = manager.mark_attendance(class_id, &present)?;
            println!("{}", display::records_table(&records));
        }
        Command::Record {
            student_id,
            date,
            status,
        } => {
            let record = manager.record_attendance(student_id, date, status)?;
            println!("{}", display::records_table(&[record]));
        }
        Command::Export { class_id, output } => {
            let export = manager.export_attendance_csv(class_id)?;
            let path = output.unwrap_or_else(|| export.filename.clone().into());

            fs::write(&path, &export.content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        Command::DeleteClass { class_id } => {
            manager.delete_class(class_id)?;
            println!("Deleted class {class_id}");
        }
        Command::DeleteStudent { student_id } => {
            manager.delete_student(student_id)?;
            println!("Deleted student {student_id}");
        }
    }

    Ok(())
}
