use savvly_common::db::memory::MemoryStore;
use savvly_common::db::{create_db_async_pool, DataStore, PgStore};
use savvly_common::events::{LedgerEvent, LedgerEvents};

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

mod env;
mod handlers;
mod middleware;
mod rates;
mod services;

use env::StoreKind;
use middleware::cors::CorsMiddleware;
use rates::{OpenErApiProvider, RateSource};
use services::api::RouteLimiters;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;
    let mut listen_on_all_interfaces = false;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = {
                    let port_result = port_str.parse::<u16>();

                    match port_result {
                        Ok(p) => p,
                        Err(_) => {
                            eprintln!("ERROR: Incorrect format for port. Integer expected");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            "--public" => {
                listen_on_all_interfaces = true;
                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = if listen_on_all_interfaces {
        format!("0.0.0.0:{}", &port)
    } else {
        format!("127.0.0.1:{}", &port)
    };

    let log_spec = match LogSpecification::parse(&env::CONF.log_level) {
        Ok(s) => s,
        Err(_) => {
            eprintln!(
                "WARNING: Invalid log level '{}'. Using 'info'",
                env::CONF.log_level
            );
            LogSpecification::info()
        }
    };

    let logger = Logger::with(log_spec)
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start();

    let _logger = match logger {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: Failed to start logger: {e}");
            std::process::exit(1);
        }
    };

    let actix_workers = env::CONF.actix_worker_count.max(1);

    let data_store: DataStore = match env::CONF.store_kind {
        StoreKind::Postgres => {
            log::info!("Connecting to database...");

            // To prevent resource starvation, max connections must be at least as large as the
            // number of actix workers
            let db_max_connections = env::CONF.db_max_connections.max(actix_workers as u32);

            let db_async_pool =
                match create_db_async_pool(&env::CONF.db_uri(), db_max_connections).await {
                    Ok(p) => p,
                    Err(e) => {
                        log::error!("{e}");
                        eprintln!("ERROR: Failed to connect to database");
                        std::process::exit(1);
                    }
                };

            log::info!("Successfully connected to database");

            Arc::new(PgStore::new(&db_async_pool))
        }
        StoreKind::Memory => {
            log::warn!("Using the in-memory store. Data will be lost when the server stops.");
            Arc::new(MemoryStore::new())
        }
    };

    let rate_source: RateSource = match OpenErApiProvider::new(
        &env::CONF.exchange_rate_api_url,
        env::CONF.exchange_rate_timeout,
    ) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("ERROR: Failed to create exchange rate client: {e}");
            std::process::exit(1);
        }
    };

    let ledger_events = LedgerEvents::default();
    let mut ledger_receiver = ledger_events.subscribe();

    actix_web::rt::spawn(async move {
        loop {
            match ledger_receiver.recv().await {
                Ok(event) => log_ledger_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Ledger event logger skipped {skipped} events")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let data_store = Data::new(data_store);
    let ledger_events = Data::new(ledger_events);
    let rate_source = Data::new(rate_source);
    let limiters = RouteLimiters::default();

    log::info!("Listening on {base_addr} with {actix_workers} workers");

    HttpServer::new(move || {
        let limiters = limiters.clone();

        App::new()
            .app_data(data_store.clone())
            .app_data(ledger_events.clone())
            .app_data(rate_source.clone())
            .configure(|cfg| services::configure(cfg, limiters))
            .wrap(CorsMiddleware::default())
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    // Safe because the server has stopped and nothing else is reading the config
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}

fn log_ledger_event(event: &LedgerEvent) {
    let user_id = event.user_id();

    match event {
        LedgerEvent::TransactionCreated {
            transaction_id,
            budget_id,
            ..
        } => log::info!(
            "Transaction {transaction_id} created by user {user_id} (budget: {budget_id:?})"
        ),
        LedgerEvent::TransactionDeleted {
            transaction_id,
            budget_id,
            ..
        } => log::info!(
            "Transaction {transaction_id} deleted by user {user_id} (budget: {budget_id:?})"
        ),
    }
}
