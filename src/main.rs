use clap::Parser;
use color_eyre::Result;
use edash::cli::{Args, ExportSelection};
use edash::{App, AppConfig, AppEvent, ConfigManager, Dashboard, Dataset, LoadOptions};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::mpsc::channel;

fn load_options(args: &Args, config: &AppConfig) -> LoadOptions {
    let mut opts = LoadOptions::new();
    if let Some(delimiter) = args.delimiter.or(config.file_loading.delimiter) {
        opts = opts.with_delimiter(delimiter);
    }
    if args.no_header {
        opts = opts.with_has_header(false);
    } else if let Some(has_header) = config.file_loading.has_header {
        opts = opts.with_has_header(has_header);
    }
    if let Some(sheet) = args.sheet.clone().or(config.file_loading.sheet.clone()) {
        opts = opts.with_sheet(sheet);
    }
    opts
}

fn filter_params(args: &Args) -> edash::FilterParams {
    edash::FilterParams {
        date_start: args.date_start,
        date_end: args.date_end,
        products: args.products.clone(),
    }
}

fn load_config() -> AppConfig {
    match ConfigManager::new(edash::APP_NAME).and_then(|m| m.load()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}", e);
            AppConfig::default()
        }
    }
}

/// Headless `--export` path: load, filter, export, exit.
fn run_headless(args: &Args, config: &AppConfig, selection: ExportSelection) -> Result<()> {
    let dataset = Dataset::load(&args.path, &load_options(args, config))?;
    let bins = args.bins.unwrap_or(config.charts.histogram_bins);
    let dashboard = Dashboard::build(dataset, filter_params(args), bins)?;

    let out_dir = args
        .out
        .clone()
        .or_else(|| config.export.out_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let reports = edash::headless_export(&dashboard, &selection.formats(), &out_dir)?;
    for report in reports {
        match (report.path, report.notice) {
            (Some(path), Some(notice)) => {
                println!("{}: {} ({})", report.format.as_str(), path.display(), notice)
            }
            (Some(path), None) => println!("{}: {}", report.format.as_str(), path.display()),
            (None, notice) => println!(
                "{}: skipped ({})",
                report.format.as_str(),
                notice.unwrap_or_default()
            ),
        }
    }
    Ok(())
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: AppConfig) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::with_config(config.clone());
    if let Some(out) = args.out.clone() {
        app.set_out_dir(out);
    }

    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Open(args.path.clone(), load_options(args, &config)))?;

    // Apply CLI filters once the dataset is loaded.
    let cli_filter = filter_params(args);

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    AppEvent::Open(path, opts) => {
                        if let Some(event) = app.event(&AppEvent::Open(path, opts)) {
                            tx.send(event)?;
                        }
                        if cli_filter.is_active() && app.dashboard().is_some() {
                            app.apply_filter_params(cli_filter.clone());
                        }
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.write_config {
        let manager = ConfigManager::new(edash::APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Wrote {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error writing config: {}", e);
                std::process::exit(1);
            }
        }
    }
    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = load_config();

    if let Some(selection) = args.export {
        if let Err(e) = run_headless(&args, &config, selection) {
            eprintln!(
                "Error: {}",
                edash::error_display::user_message_from_report(&e, Some(&args.path))
            );
            std::process::exit(1);
        }
        return Ok(());
    }

    let terminal = ratatui::init();
    let result = run(terminal, &args, config);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
