use clap::{Parser, Subcommand};
use deckwod_core::history::{all_time_summary, write_csv};
use deckwod_core::session::SessionSnapshot;
use deckwod_core::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "deckwod")]
#[command(about = "Deck-of-cards workout tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Work through a deck (default)
    Run {
        /// Draw every card without prompting (for testing)
        #[arg(long)]
        auto: bool,

        /// Select a deck preset by id before starting
        #[arg(long)]
        preset: Option<String>,

        /// Number of jokers (0-2)
        #[arg(long)]
        jokers: Option<usize>,

        /// Deck size (quarter, half, threequarters, full)
        #[arg(long)]
        deck_size: Option<String>,

        /// Seed the shuffle for a repeatable deck
        #[arg(long)]
        seed: Option<u64>,

        /// Write the session to this JSON file when it ends
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// List deck presets
    Presets,

    /// Show the workout library
    Library {
        /// Show the joker library instead
        #[arg(long)]
        jokers: bool,
    },

    /// Generate a random workout from the library
    Random {
        /// Seed the generator for a repeatable workout
        #[arg(long)]
        seed: Option<u64>,

        /// Work through the generated deck
        #[arg(long)]
        run: bool,

        /// Work through the generated deck without prompting (for testing)
        #[arg(long)]
        auto: bool,
    },

    /// Show completed workouts
    History {
        /// Export the history to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    deckwod_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    tracing::debug!("Using settings directory {:?}", config.settings_dir());
    let mut settings = SettingsStore::open(FileStore::new(config.settings_dir()), &config);

    match cli.command {
        Some(Commands::Run {
            auto,
            preset,
            jokers,
            deck_size,
            seed,
            export,
        }) => cmd_run(
            &mut settings,
            &config,
            RunOptions {
                auto,
                preset,
                jokers,
                deck_size,
                seed,
                export,
            },
        ),
        Some(Commands::Presets) => cmd_presets(&settings),
        Some(Commands::Library { jokers }) => cmd_library(&settings, jokers),
        Some(Commands::Random { seed, run, auto }) => {
            cmd_random(&mut settings, &config, seed, run || auto, auto)
        }
        Some(Commands::History { csv }) => cmd_history(&settings, csv.as_deref()),
        None => {
            // Default to an interactive run
            cmd_run(&mut settings, &config, RunOptions::default())
        }
    }
}

#[derive(Default)]
struct RunOptions {
    auto: bool,
    preset: Option<String>,
    jokers: Option<usize>,
    deck_size: Option<String>,
    seed: Option<u64>,
    export: Option<PathBuf>,
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn cmd_run(settings: &mut SettingsStore<FileStore>, config: &Config, options: RunOptions) -> Result<()> {
    if let Some(ref id) = options.preset {
        if !settings.select_preset(id) {
            return Err(Error::Other(format!("Unknown preset: {}", id)));
        }
    }
    if let Some(jokers) = options.jokers {
        settings.set_num_jokers(jokers);
    }
    if let Some(ref key) = options.deck_size {
        let size = DeckSize::from_key(key)
            .ok_or_else(|| Error::Other(format!("Unknown deck size: {}", key)))?;
        settings.set_deck_size(size);
    }

    let mut rng = make_rng(options.seed);
    let setup = settings.session_setup();
    play(settings, config, setup, &mut rng, options.auto, options.export.as_deref())
}

/// Work through one session and record it when the deck runs out
fn play(
    settings: &mut SettingsStore<FileStore>,
    config: &Config,
    setup: SessionSetup,
    rng: &mut StdRng,
    auto: bool,
    export: Option<&Path>,
) -> Result<()> {
    let mut session = Session::new(setup, rng);
    display_setup(session.setup());

    if auto {
        loop {
            match session.draw(rng) {
                DrawOutcome::Drawn(drawn) => display_card(&drawn),
                DrawOutcome::Completed(entry) => {
                    finish(settings, entry);
                    break;
                }
                DrawOutcome::Finished => break,
            }
        }
    } else {
        run_interactive(settings, config, &mut session, rng, export)?;
    }

    if let Some(path) = export {
        session.export_snapshot().write_to(path)?;
        println!("✓ Session exported to {}", path.display());
    }

    settings.flush();
    Ok(())
}

fn run_interactive(
    settings: &mut SettingsStore<FileStore>,
    config: &Config,
    session: &mut Session,
    rng: &mut StdRng,
    export: Option<&Path>,
) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        settings.tick(Instant::now());
        print_prompt(session)?;

        let Some(line) = lines.next() else {
            // EOF
            break;
        };
        let line = line?;

        match line.trim().to_lowercase().as_str() {
            "" => match session.draw(rng) {
                DrawOutcome::Drawn(drawn) => display_card(&drawn),
                DrawOutcome::Completed(entry) => finish(settings, entry),
                DrawOutcome::Finished => println!("Deck complete. 'r' to start over, 'q' to quit."),
            },
            "p" => {
                if session.previous() {
                    if let Showing::Card(drawn) = session.showing() {
                        print!("Back to: ");
                        display_card(drawn);
                    }
                } else {
                    println!("Nothing to go back to.");
                }
            }
            "r" => {
                session.reset(rng);
                println!("\nReshuffled. {} cards in the deck.", session.remaining());
            }
            "e" => {
                let snapshot = session.export_snapshot();
                let path = export
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| default_export_path(config, &snapshot));
                snapshot.write_to(&path)?;
                println!("✓ Session exported to {}", path.display());
            }
            "q" => break,
            other => println!("Unknown command: {}", other),
        }
    }

    Ok(())
}

fn default_export_path(config: &Config, snapshot: &SessionSnapshot) -> PathBuf {
    config
        .data
        .data_dir
        .join("exports")
        .join(format!("session-{}.json", snapshot.session_id))
}

fn print_prompt(session: &Session) -> Result<()> {
    println!("─────────────────────────────────────────");
    println!(
        "{} cards left · {} reps so far",
        session.remaining(),
        session.totals().total_reps()
    );
    println!("Enter to draw · 'p' previous · 'r' reset · 'e' export · 'q' quit");
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn finish(settings: &mut SettingsStore<FileStore>, entry: WorkoutHistoryEntry) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  DECK COMPLETE");
    println!("╰─────────────────────────────────────────╯");
    println!("  {} cards · {} reps", entry.cards_completed_or_estimate(), entry.total_reps);
    for detail in &entry.suits {
        println!("  {} {}: {}", detail.suit.symbol(), detail.workout, detail.reps);
    }
    if !entry.jokers.is_empty() {
        println!("  Jokers: {}", entry.jokers.join(", "));
    }

    settings.record_workout(entry);
    println!("\n✓ Workout saved to history");
}

fn display_setup(setup: &SessionSetup) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", setup.workout_name.to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    for (suit, assignment) in setup.suits.iter() {
        println!("  {} {}", suit.symbol(), assignment);
    }
    println!(
        "  {} deck · {} joker(s) · aces {}",
        setup.deck_size.key(),
        setup.jokers,
        if setup.rules.ace_high { "high" } else { "low" }
    );
    println!();
}

fn display_card(drawn: &DrawnCard) {
    if drawn.is_joker() {
        println!("  JOKER  {}", drawn.exercise);
    } else {
        println!(
            "  {}{}  {} × {}",
            drawn.card.rank.label(),
            drawn.card.suit.symbol(),
            drawn.reps,
            drawn.exercise
        );
    }
}

fn cmd_presets(settings: &SettingsStore<FileStore>) -> Result<()> {
    let current = &settings.settings().selected_preset_id;
    for preset in &settings.settings().deck_presets {
        let marker = if &preset.id == current { "*" } else { " " };
        println!(
            "{} {} ({}) · {} joker(s)",
            marker,
            preset.name,
            preset.id,
            preset.joker_slots.joker_count()
        );
        for (suit, assignment) in preset.suits.iter() {
            println!("    {} {}", suit.symbol(), assignment);
        }
    }
    Ok(())
}

fn cmd_library(settings: &SettingsStore<FileStore>, jokers: bool) -> Result<()> {
    let rows = if jokers {
        &settings.settings().joker_library
    } else {
        &settings.settings().workout_library
    };
    for row in rows {
        println!(
            "[{}] {:<32} L{}  {:<10} {}",
            if row.include { "x" } else { " " },
            row.label(),
            row.difficulty.get(),
            row.focus.label(),
            if row.needs_weights() { "weights" } else { "" }
        );
    }
    Ok(())
}

fn cmd_random(
    settings: &mut SettingsStore<FileStore>,
    config: &Config,
    seed: Option<u64>,
    run: bool,
    auto: bool,
) -> Result<()> {
    let mut rng = make_rng(seed);
    let setup = settings.random_session_setup(&mut rng);
    if let Some(ref pool) = setup.session_jokers {
        println!("Joker pool: {}", pool.join(", "));
    }

    if run {
        return play(settings, config, setup, &mut rng, auto, None);
    }
    display_setup(&setup);
    Ok(())
}

fn cmd_history(settings: &SettingsStore<FileStore>, csv: Option<&Path>) -> Result<()> {
    let history = &settings.settings().history;
    if history.is_empty() {
        println!("No workouts recorded yet.");
    }
    for entry in history {
        println!(
            "{}  {:<16} {:>4} reps  {:>3} cards",
            entry.completed_at.format("%Y-%m-%d %H:%M"),
            entry.workout_name,
            entry.total_reps,
            entry.cards_completed_or_estimate()
        );
    }

    if !history.is_empty() {
        let summary = all_time_summary(history);
        println!();
        println!(
            "All time: {} reps · {} cards · {} jokers",
            summary.total_reps, summary.cards_completed, summary.jokers_completed
        );
        for (label, reps) in &summary.breakdown {
            println!("  {:<24} {}", label, reps);
        }
    }

    if let Some(path) = csv {
        let count = write_csv(history, path)?;
        println!("✓ Exported {} workouts to {}", count, path.display());
    }
    Ok(())
}
