use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand};
use inquire::Text;

use crate::config::Settings;
use crate::error::ApiError;
use crate::models::appointment::{AppointmentChanges, AppointmentStatus};
use crate::models::blog::BlogDraft;
use crate::models::consultant::{ConsultantFilter, filter_consultants};
use crate::models::slot::{NewSlot, window_label};
use crate::service::api_service::ApiService;
use crate::service::availability::is_bookable;
use crate::service::booking_service::{BookingService, ConsultantAvailability};
use crate::service::staff_schedule_service::StaffScheduleService;

#[derive(Parser)]
#[command(about = "Browse consultants, book appointments and manage schedules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List consultants with their profiles
    Consultants {
        /// Match name, field of study or specialty
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        specialty: Option<String>,
    },
    /// List slot definitions
    Slots,
    /// Define a new slot, times as HH:MM
    CreateSlot {
        #[arg(value_parser = parse_clock)]
        start: NaiveTime,
        #[arg(value_parser = parse_clock)]
        end: NaiveTime,
        #[arg(long)]
        label: Option<String>,
    },
    /// List schedule entries, optionally for one consultant
    Schedules {
        #[arg(long)]
        consultant: Option<String>,
    },
    /// Show one schedule entry
    Schedule {
        id: String,
    },
    /// Show the bookable schedule of a consultant grouped by date
    Availability {
        consultant: String,
        /// Pretend the current time is "YYYY-MM-DD HH:MM"
        #[arg(long)]
        at: Option<String>,
    },
    /// Book a schedule entry
    Book {
        consultant: String,
        schedule: i64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Staff view of one consultant's slots on a day
    StaffDay {
        consultant: String,
        date: NaiveDate,
    },
    /// Register working slots for a consultant
    Register {
        consultant: String,
        date: NaiveDate,
        #[arg(value_delimiter = ',', required = true)]
        slots: Vec<i64>,
    },
    /// Change an appointment's status (BOOKED, CONSULTED, CANCELLED)
    Status {
        appointment: String,
        status: String,
    },
    CheckIn {
        appointment: String,
    },
    /// Edit an appointment's description, status, meeting link or date
    UpdateAppointment {
        appointment: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        meeting_link: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    DeleteAppointment {
        appointment: String,
    },
    Appointments {
        #[arg(long)]
        member: Option<String>,
    },
    Blogs,
    Blog {
        id: String,
    },
    CreateBlog(BlogArgs),
    UpdateBlog {
        id: String,
        #[command(flatten)]
        blog: BlogArgs,
    },
    DeleteBlog {
        id: String,
    },
}

#[derive(Args)]
struct BlogArgs {
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    content: String,
    #[arg(long, default_value = "")]
    category: String,
    #[arg(long, default_value = "")]
    author: String,
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,
}

impl BlogArgs {
    fn draft(&self) -> BlogDraft {
        BlogDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            author: self.author.clone(),
            tags: self.tags.clone(),
            ..Default::default()
        }
    }
}

pub async fn cli(api: ApiService, settings: Settings) -> Result<(), ApiError> {
    let cli = Cli::parse();
    run(&cli.command, &api, &settings).await
}

async fn run(command: &Commands, api: &ApiService, settings: &Settings) -> Result<(), ApiError> {
    match command {
        Commands::Consultants { search, specialty } => {
            let filter = ConsultantFilter {
                search: search.clone(),
                specialty: specialty.clone(),
            };
            let consultants = filter_consultants(api.get_consultants().await?, &filter);
            if consultants.is_empty() {
                println!("No consultants found.");
            }
            for c in consultants {
                println!(
                    "#{} {} ({}) rating {:.1} - {}",
                    c.consultant_id.map(|id| id.to_string()).unwrap_or("?".to_string()),
                    c.name,
                    c.field_of_study,
                    c.rating,
                    c.specialties.join(", ")
                );
            }
        }
        Commands::Slots => {
            for slot in api.get_slots().await? {
                println!("#{} {}", slot.id, slot.label);
            }
        }
        Commands::CreateSlot { start, end, label } => {
            let slot = NewSlot {
                slot_start: *start,
                slot_end: *end,
                label: label.clone(),
            };
            api.create_slot(&slot).await?;
            println!("Slot {} created.", window_label(Some(*start), Some(*end)));
        }
        Commands::Schedules { consultant } => {
            let staff = StaffScheduleService::new(api);
            for entry in staff.schedules_for(consultant.as_deref()).await? {
                println!(
                    "#{} {} {} consultant {} {}",
                    entry.id,
                    entry.date_key(),
                    entry.slot_label(),
                    entry.consultant_id.as_deref().unwrap_or("?"),
                    if entry.booked { "booked" } else { "free" }
                );
            }
        }
        Commands::Schedule { id } => {
            let entry = api.get_schedule(id).await?;
            println!(
                "#{} {} {} consultant {} {}",
                entry.id,
                entry.date_key(),
                entry.slot_label(),
                entry.consultant_id.as_deref().unwrap_or("?"),
                if entry.booked { "booked" } else { "free" }
            );
        }
        Commands::Availability { consultant, at } => {
            let now = match at {
                Some(text) => parse_now(text)?,
                None => settings.now(),
            };
            let booking = BookingService::new(api);
            let availability = booking.load_availability(consultant, now).await?;
            print_availability(&availability, now);
        }
        Commands::Book {
            consultant,
            schedule,
            description,
        } => {
            let now = settings.now();
            let booking = BookingService::new(api);
            let availability = booking.load_availability(consultant, now).await?;
            let description = match description {
                Some(d) => Some(d.clone()),
                None => prompt_description(),
            };
            let outcome = booking.book(&availability, *schedule, description, now).await?;
            println!("Booked schedule #{}.", schedule);
            if let Some(refreshed) = outcome.availability {
                print_availability(&refreshed, now);
            }
        }
        Commands::StaffDay { consultant, date } => {
            let staff = StaffScheduleService::new(api);
            for item in staff.day_view(consultant, *date).await? {
                println!(
                    "#{} {} {}",
                    item.slot.id,
                    item.slot.label,
                    if item.booked { "[booked]" } else { "" }
                );
            }
        }
        Commands::Register {
            consultant,
            date,
            slots,
        } => {
            let staff = StaffScheduleService::new(api);
            let outcome = staff.register(consultant, *date, slots, settings.today()).await?;
            println!("Registered {} slot(s).", outcome.registered.len());
        }
        Commands::Status {
            appointment,
            status,
        } => {
            api.update_appointment_status(appointment, status).await?;
            println!("Appointment #{} is now {}.", appointment, status);
        }
        Commands::CheckIn { appointment } => {
            api.check_in_appointment(appointment).await?;
            println!("Checked in appointment #{}.", appointment);
        }
        Commands::UpdateAppointment {
            appointment,
            description,
            status,
            meeting_link,
            date,
        } => {
            let status = match status {
                Some(s) => Some(s.parse::<AppointmentStatus>()?),
                None => None,
            };
            let changes = AppointmentChanges {
                description: description.clone(),
                status,
                meeting_link: meeting_link.clone(),
                appointment_date: date.clone(),
            };
            api.update_appointment(appointment, &changes).await?;
            println!("Appointment #{} updated.", appointment);
        }
        Commands::DeleteAppointment { appointment } => {
            api.delete_appointment(appointment).await?;
            println!("Appointment #{} deleted.", appointment);
        }
        Commands::Appointments { member } => match member {
            Some(member) => {
                for item in api.get_member_appointments(member).await? {
                    let when = match &item.schedule {
                        Some(s) => format!("{} {}", s.date_key(), s.slot_label()),
                        None => window_label(None, None),
                    };
                    let with = item
                        .consultant
                        .as_ref()
                        .map(|c| c.consultant_name.clone())
                        .unwrap_or(item.appointment.consultant_name.clone());
                    println!(
                        "#{} {} with {} [{}]{}",
                        item.appointment.id,
                        when,
                        with,
                        item.appointment.status,
                        if item.appointment.checked_in { " checked in" } else { "" }
                    );
                }
            }
            None => {
                for a in api.get_appointments().await? {
                    println!(
                        "#{} {} {} -> {} [{}]",
                        a.id,
                        a.appointment_date.as_deref().unwrap_or("?"),
                        a.account_name,
                        a.consultant_name,
                        a.status
                    );
                }
            }
        },
        Commands::Blogs => {
            for blog in api.get_blogs().await? {
                println!("#{} {} ({}, {})", blog.id, blog.title, blog.date, blog.read_time);
            }
        }
        Commands::Blog { id } => {
            let blog = api.get_blog(id).await?;
            println!("{}\n{}\n\n{}", blog.title, blog.description, blog.content);
            if !blog.tags.is_empty() {
                println!("\ntags: {}", blog.tags.join(", "));
            }
        }
        Commands::CreateBlog(blog) => {
            api.create_blog(blog.draft()).await?;
            println!("Blog created.");
        }
        Commands::UpdateBlog { id, blog } => {
            api.update_blog(id, blog.draft()).await?;
            println!("Blog #{} updated.", id);
        }
        Commands::DeleteBlog { id } => {
            api.delete_blog(id).await?;
            println!("Blog #{} deleted.", id);
        }
    }
    Ok(())
}

fn print_availability(availability: &ConsultantAvailability, now: NaiveDateTime) {
    if availability.is_empty() {
        println!("No upcoming schedule for consultant {}.", availability.consultant_id);
        return;
    }
    for (date, entries) in &availability.days {
        println!("{}", date);
        for entry in entries {
            let marker = if is_bookable(entry, now) { "" } else { " (booked)" };
            println!("  #{} {}{}", entry.id, entry.slot_label(), marker);
        }
    }
}

fn parse_now(text: &str) -> Result<NaiveDateTime, ApiError> {
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
        .ok_or_else(|| ApiError::validation(format!("invalid time: {}", text)))
}

fn parse_clock(text: &str) -> Result<NaiveTime, String> {
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text.trim(), format).ok())
        .ok_or_else(|| format!("invalid time: {}", text))
}

fn prompt_description() -> Option<String> {
    Text::new("Anything the consultant should know? (optional)")
        .prompt()
        .ok()
        .filter(|d| !d.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::clients::backend_client::{ApiRequest, ApiResponse, BackendTransport, TransportError};
    use crate::config::AppConfig;

    #[derive(Default)]
    struct UnreachableBackend {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl BackendTransport for UnreachableBackend {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::NoResponse("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_command_is_returned_to_the_caller() {
        let backend = Arc::new(UnreachableBackend::default());
        let api = ApiService::new(backend.clone());
        let settings = Settings::from_config(&AppConfig::parse("TIMEZONE=UTC").unwrap()).unwrap();

        let invalid = Commands::Status {
            appointment: "1".to_string(),
            status: "DONE".to_string(),
        };
        assert!(matches!(
            run(&invalid, &api, &settings).await,
            Err(ApiError::Validation(_))
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let offline = Commands::CheckIn {
            appointment: "1".to_string(),
        };
        assert!(matches!(
            run(&offline, &api, &settings).await,
            Err(ApiError::Network(_))
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parse_now_accepts_common_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_now("2024-01-01 09:30").unwrap(), expected);
        assert_eq!(parse_now("2024-01-01T09:30").unwrap(), expected);
        assert!(parse_now("tomorrow").is_err());
    }

    #[test]
    fn cli_parses_register_slot_list() {
        let cli = Cli::try_parse_from(["counsel-booking", "register", "5", "2024-03-01", "1,2,3"]).unwrap();
        match cli.command {
            Commands::Register { consultant, date, slots } => {
                assert_eq!(consultant, "5");
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
                assert_eq!(slots, vec![1, 2, 3]);
            }
            _ => panic!("expected register"),
        }
    }

    #[test]
    fn cli_parses_consultant_filters_and_slot_times() {
        let cli = Cli::try_parse_from(["counsel-booking", "consultants", "--search", "lan", "--specialty", "Family"])
            .unwrap();
        match cli.command {
            Commands::Consultants { search, specialty } => {
                assert_eq!(search.as_deref(), Some("lan"));
                assert_eq!(specialty.as_deref(), Some("Family"));
            }
            _ => panic!("expected consultants"),
        }

        let cli = Cli::try_parse_from(["counsel-booking", "create-slot", "09:00", "10:30:00"]).unwrap();
        match cli.command {
            Commands::CreateSlot { start, end, label } => {
                assert_eq!(start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
                assert_eq!(end, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
                assert_eq!(label, None);
            }
            _ => panic!("expected create-slot"),
        }
        assert!(Cli::try_parse_from(["counsel-booking", "create-slot", "nine", "10:00"]).is_err());
    }

    #[test]
    fn cli_parses_update_blog_fields() {
        let cli = Cli::try_parse_from(["counsel-booking", "update-blog", "3", "Sleep", "--tags", "a,b"]).unwrap();
        match cli.command {
            Commands::UpdateBlog { id, blog } => {
                assert_eq!(id, "3");
                let draft = blog.draft();
                assert_eq!(draft.title, "Sleep");
                assert_eq!(draft.tags, vec!["a".to_string(), "b".to_string()]);
            }
            _ => panic!("expected update-blog"),
        }
    }
}
