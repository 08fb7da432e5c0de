use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use mavtcp_link::{open, MavConnection};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_url, EchoArgs, Session, POLL_INTERVAL};
use crate::exit::{link_error, CliResult, SUCCESS};

pub fn run(args: EchoArgs, session: Session) -> CliResult<i32> {
    let url = parse_url(&args.url)?;
    let link: Arc<dyn MavConnection> = Arc::from(
        open(&url, session.server_config()).map_err(|err| link_error("open failed", err))?,
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let echoed = Arc::new(AtomicUsize::new(0));
    let weak: Weak<dyn MavConnection> = Arc::downgrade(&link);
    let counter = Arc::clone(&echoed);
    link.events().on_frame(move |frame, _source| {
        let Some(link) = weak.upgrade() else {
            return;
        };
        match link.try_send_frame(frame) {
            Ok(true) => {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(false) => {}
            Err(err) => warn!(msgid = frame.msgid, error = %err, "echo failed"),
        }
    });

    info!(%url, channel = link.channel(), "echoing frames");

    while running.load(Ordering::SeqCst) && link.is_open() {
        if args
            .count
            .is_some_and(|count| echoed.load(Ordering::SeqCst) >= count)
        {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    link.close();
    info!(echoed = echoed.load(Ordering::SeqCst), "echo finished");
    Ok(SUCCESS)
}
