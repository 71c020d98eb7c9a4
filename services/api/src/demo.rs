use crate::infra::open_repository;
use clap::Args;
use fundraiser::config::{AppConfig, DatabaseConfig, ProgramConfig};
use fundraiser::error::AppError;
use fundraiser::fundraising::{
    Amount, DonationSubmission, FundraisingError, FundraisingRepository, FundraisingService,
    InternRegistration, LeaderboardEntry, UserId,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct LeaderboardArgs {
    /// Override the configured SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
    /// Emit the standings as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Goal assigned to every demo intern, e.g. `100` or `250.50`
    #[arg(long, default_value = "100")]
    pub(crate) goal: String,
    /// Emit the final standings as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_leaderboard(args: LeaderboardArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(database) = args.database {
        config.database.path = database;
    }

    let repository = open_repository(&config.database)?;
    let service = FundraisingService::new(repository, config.program);
    let entries = standings(&service)?;

    render_standings(&entries, args.json);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let goal = parse_amount(&args.goal)?;

    let repository = open_repository(&DatabaseConfig {
        path: PathBuf::from(":memory:"),
    })?;
    let service = FundraisingService::new(repository, ProgramConfig { default_goal: goal });

    println!("Intern fundraising demo (goal ${goal} each)");

    let mut interns = Vec::new();
    for (username, first, last) in [
        ("ada", "Ada", "Lovelace"),
        ("grace", "Grace", "Hopper"),
        ("linus", "Linus", "Torvalds"),
        ("barbara", "Barbara", "Liskov"),
        ("ken", "Ken", "Thompson"),
    ] {
        let intern = service.register_intern(InternRegistration {
            user_id: UserId(format!("demo-{username}")),
            username: username.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{username}@example.org"),
            goal_amount: None,
        })?;
        println!("  Registered {first} {last} with referral code {}", intern.referral_code);
        interns.push(intern);
    }

    println!("\nDonations");
    let gifts: [(usize, &str, Option<&str>); 7] = [
        (0, "50", Some("Charles")),
        (0, "60.00", None),
        (0, "1", Some("Charles")),
        (1, "300", Some("Alan")),
        (2, "300", None),
        (3, "200", Some("Edsger")),
        (4, "100", Some("Dennis")),
    ];
    for (index, amount, donor) in gifts {
        let intern = &interns[index];
        let receipt = service.record_donation(DonationSubmission {
            referral_code: intern.referral_code.clone(),
            amount: Some(parse_amount(amount)?),
            donor_name: donor.map(str::to_string),
            ..DonationSubmission::default()
        })?;

        println!(
            "  {} -> {}: total ${}, {} points, rank {}",
            receipt.donation.donor_name,
            intern.referral_code,
            receipt.intern.total_raised,
            receipt.intern.points,
            receipt.intern.rank
        );
        for achievement in &receipt.unlocked {
            println!("    {} {}", achievement.icon, achievement.title);
        }
    }

    let rejected = service.record_donation(DonationSubmission {
        referral_code: "nobody".to_string(),
        amount: Some(Amount::from_dollars(5)),
        ..DonationSubmission::default()
    });
    if let Err(err) = rejected {
        println!("  Unknown referral code rejected: {err}");
    }

    let ada = &interns[0];
    let dashboard = service.dashboard(ada.id)?;
    println!(
        "\nDashboard for {}: {} donations, {} unread notifications, {} achievements",
        ada.referral_code,
        dashboard.total_donations_count,
        dashboard.unread_notifications,
        dashboard.achievements_count
    );
    for notification in service.notifications(ada.id)?.iter().take(3) {
        println!("  [{}] {}", notification.created_at.format("%H:%M:%S"), notification.message);
    }

    println!("\nLeaderboard");
    let entries = standings(&service)?;
    render_standings(&entries, args.json);
    Ok(())
}

fn parse_amount(raw: &str) -> Result<Amount, AppError> {
    Amount::parse(raw).map_err(|err| FundraisingError::Validation(err.to_string()).into())
}

fn standings<R>(service: &FundraisingService<R>) -> Result<Vec<LeaderboardEntry>, AppError>
where
    R: FundraisingRepository + 'static,
{
    Ok(service
        .leaderboard()?
        .iter()
        .map(LeaderboardEntry::from)
        .collect())
}

fn render_standings(entries: &[LeaderboardEntry], as_json: bool) {
    if as_json {
        match serde_json::to_string_pretty(entries) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("  Standings unavailable: {err}"),
        }
        return;
    }

    if entries.is_empty() {
        println!("  No interns registered yet");
        return;
    }
    for entry in entries {
        println!(
            "  #{:<3} {:<24} {:>10} {:>6} pts  ({})",
            entry.rank,
            entry.full_name,
            format!("${}", entry.total_raised),
            entry.points,
            entry.referral_code
        );
    }
}
