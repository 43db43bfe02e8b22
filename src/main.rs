use std::{future::IntoFuture, pin::pin, process};

use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vitrine::{
    application::{
        error::AppError,
        render::{RenderEnv, RenderService},
    },
    config,
    domain::{blocks::ContentNode, error::DomainError},
    infra::{error::InfraError, http, telemetry},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::RenderFile(args) => run_render_file(settings, args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = http::HttpState::new(&settings).map_err(AppError::from)?;
    let router = http::build_router(state, &settings);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "vitrine::serve",
        addr = %settings.server.addr,
        proxy_path = %settings.render.proxy_path,
        "listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = shutdown_rx.changed().await;
        },
    );
    let mut server = pin!(server.into_future());

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = shutdown_signal() => {
            info!(target = "vitrine::serve", "shutdown signal received, draining");
            let _ = shutdown_tx.send(true);
        }
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(result) => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            info!(target = "vitrine::serve", "shutdown complete");
            Ok(())
        }
        Err(_) => {
            warn!(
                target = "vitrine::serve",
                "graceful shutdown timed out, exiting with connections open"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "vitrine::serve", error = %err, "failed to install signal handler");
        std::future::pending::<()>().await;
    }
}

fn run_render_file(
    settings: config::Settings,
    args: config::RenderFileArgs,
) -> Result<(), AppError> {
    let source = std::fs::read_to_string(&args.file)
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let blocks: Vec<ContentNode> = serde_json::from_str(&source).map_err(|err| {
        DomainError::validation(format!(
            "`{}` is not a content-node array: {err}",
            args.file.display()
        ))
    })?;

    let env = RenderEnv {
        interactive: args.interactive,
        ..RenderEnv::default()
    };
    let output = RenderService::new(&settings.render).render(&blocks, env);

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .map_err(|err| AppError::unexpected(format!("failed to serialize output: {err}")))?;

    println!("{rendered}");
    Ok(())
}
