pub mod dashboard;
pub mod form;
pub mod graph_view;

pub use dashboard::{Dashboard, DashboardMessage, DashboardOptions};

use anyhow::Result;
use crawlscope_client::ApiClient;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

// ~30 frames per second while the force layout animates.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Run the dashboard until the user quits (blocking, run it off the async workers).
///
/// Backend requests are spawned on `runtime` and report back over a channel.
pub fn run_dashboard(client: ApiClient, runtime: Handle, options: DashboardOptions) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut dashboard = Dashboard::new(client, runtime, options);
    dashboard.reload_jobs(Duration::ZERO);
    info!("Dashboard started");

    let result = run_loop(&mut terminal, &mut dashboard);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    info!("Dashboard closed");

    result
}

fn run_loop<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, dashboard: &mut Dashboard) -> Result<()> {
    loop {
        dashboard.process_messages();
        dashboard.on_tick();
        terminal.draw(|f| dashboard.render(f))?;

        if dashboard.should_quit {
            return Ok(());
        }

        if event::poll(FRAME_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => dashboard.handle_key(key),
                Event::Mouse(mouse) => dashboard.handle_mouse(mouse),
                _ => {}
            }
        }
    }
}
