pub mod capture;
pub mod prefs;
pub mod press;
pub mod run;
pub mod settings;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use shellpilot::Session;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let session = Session::connect(&cli.host, cli.port).await?;
    session.start_session().await?;

    let result = match &cli.command {
        Commands::Run { name } => run::execute(&session, name).await,
        Commands::Capture { output } => capture::execute(&session, output).await,
        Commands::Press { button } => press::execute(&session, button).await,
        Commands::Getpref { name } => prefs::get(&session, name).await,
        Commands::Setpref { assignment } => prefs::set(&session, assignment).await,
        Commands::Getsettings { name } => settings::get(&session, name).await,
        Commands::Setsettings { assignment } => settings::set(&session, assignment).await,
        Commands::Getallsettings => settings::get_all(&session).await,
    };

    // Teardown is unconditional; a failed command must not leak the transport.
    let teardown = session.delete_session().await;
    result?;
    teardown?;
    Ok(())
}
