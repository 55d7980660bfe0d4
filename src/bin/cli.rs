use pki_scheduler::{
    AppConfig, Class, ClassStore, EnrollmentAction, Professor, SqliteClassStore,
    import_roster_file, recommend_swaps, save_classes_to_csv,
};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

const CLASS_COLUMNS: [&str; 7] = [
    "id",
    "course",
    "section",
    "title",
    "room",
    "time",
    "enrollment",
];

fn class_cells(class: &Class) -> [String; 7] {
    [
        class.id.to_string(),
        class.course_number.clone(),
        class.section.clone(),
        class.course_title.clone(),
        class.room.clone(),
        class.meeting_pattern.clone(),
        format!("{}/{}", class.enrollment, class.max_enrollment),
    ]
}

fn render_classes_as_text_table(classes: &[Class]) -> String {
    let rows: Vec<[String; 7]> = classes.iter().map(class_cells).collect();

    // Compute column widths
    let mut widths: Vec<usize> = CLASS_COLUMNS.iter().map(|n| n.len()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_line = |cells: &mut dyn Iterator<Item = &str>| {
        let mut line = String::from("|");
        for (ci, cell) in cells.enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.chars().count())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_line(&mut CLASS_COLUMNS.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_line(&mut row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_professors(professors: &[Professor]) {
    if professors.is_empty() {
        println!("No professors.");
        return;
    }
    for professor in professors {
        println!("  {:>4}  {}", professor.id, professor.name());
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  import <path>                      Import a roster CSV\n  export <path>                      Export classes to a roster CSV\n  list                               List all classes\n  show <id>                          Show one class with its professors\n  professors [id]                    List professors (of one class)\n  enroll <id> <add|remove>           Change enrollment by one\n  swap <id> <id>                     Swap rooms and capacities of two classes\n  reassign <id>                      List classes that could trade rooms\n  recommend                          Recommend room swaps for overfull classes\n  quit|exit                          Exit"
    );
}

fn parse_id(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.parse::<i64>().ok())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };
    if let Some(path) = std::env::args().nth(1) {
        config.database_path = path.into();
    }
    let store = match SqliteClassStore::new(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "PKI Scheduler (CLI) - database {} - type 'help' for commands\n",
        config.database_path.display()
    );

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "import" => {
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    println!("Usage: import <path>");
                    continue;
                }
                let path = rest.join(" ");
                match import_roster_file(&store, &path) {
                    Ok(report) => {
                        println!("Imported {}: {}", path, report.to_cli_summary());
                        for skipped in &report.skipped {
                            println!("  skipped {}", skipped);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "export" => {
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    println!("Usage: export <path>");
                    continue;
                }
                let path = rest.join(" ");
                match save_classes_to_csv(&store, &path) {
                    Ok(count) => println!("Exported {} classes to {}.", count, path),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "list" => match store.all_classes() {
                Ok(classes) => println!("{}", render_classes_as_text_table(&classes)),
                Err(e) => println!("Error: {}", e),
            },
            "show" => {
                let Some(id) = parse_id(parts.next()) else {
                    println!("Usage: show <id>");
                    continue;
                };
                match store.get_class(id) {
                    Ok(class) => {
                        println!("{}", render_classes_as_text_table(std::slice::from_ref(&class)));
                        match store.professors_for_class(id) {
                            Ok(professors) => print_professors(&professors),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "professors" => {
                let result = match parts.next() {
                    Some(raw) => match raw.parse::<i64>() {
                        Ok(id) => store.professors_for_class(id),
                        Err(_) => {
                            println!("Invalid id");
                            continue;
                        }
                    },
                    None => store.list_professors(),
                };
                match result {
                    Ok(professors) => print_professors(&professors),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "enroll" => {
                let id = parse_id(parts.next());
                let action = parts.next().map(str::parse::<EnrollmentAction>);
                match (id, action) {
                    (Some(id), Some(Ok(action))) => match store.update_enrollment(id, action) {
                        Ok(enrollment) => {
                            println!("Class {} enrollment is now {}.", id, enrollment)
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    (_, Some(Err(e))) => println!("Error: {}", e),
                    _ => println!("Usage: enroll <id> <add|remove>"),
                }
            }
            "swap" => match (parse_id(parts.next()), parse_id(parts.next())) {
                (Some(first), Some(second)) => match store.swap_rooms(first, second, false) {
                    Ok(()) => println!("Swapped rooms of classes {} and {}.", first, second),
                    Err(e) => println!("Error: {}", e),
                },
                _ => println!("Usage: swap <id> <id>"),
            },
            "reassign" => {
                let Some(id) = parse_id(parts.next()) else {
                    println!("Usage: reassign <id>");
                    continue;
                };
                match store.possible_reassignments(id) {
                    Ok(classes) if classes.is_empty() => {
                        println!("No classes can trade rooms with class {}.", id)
                    }
                    Ok(classes) => println!("{}", render_classes_as_text_table(&classes)),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "recommend" => match store.all_classes() {
                Ok(classes) => {
                    let recommendations = recommend_swaps(&classes);
                    if recommendations.is_empty() {
                        println!("No recommendations found.");
                    }
                    for (slot, swaps) in &recommendations.same_slot_swaps {
                        println!("Recommendations for {}:", slot);
                        for swap in swaps {
                            println!(
                                "  Swap {} with {} ({})",
                                swap.crowded_room, swap.target_room, swap.reason
                            );
                        }
                    }
                    for (slot, recs) in &recommendations.cross_slot_recommendations {
                        println!("Cross-slot recommendations for {}:", slot);
                        for rec in recs {
                            println!(
                                "  Move {} to {} at {} ({})",
                                rec.crowded_room, rec.target_room, rec.target_slot, rec.reason
                            );
                        }
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
