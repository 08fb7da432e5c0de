use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;

use mavtcp_link::{open, LinkEvent};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_url, ListenArgs, Session, POLL_INTERVAL};
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::print_frame;

pub fn run(args: ListenArgs, session: Session) -> CliResult<i32> {
    let url = parse_url(&args.url)?;
    let link = open(&url, session.server_config()).map_err(|err| link_error("open failed", err))?;
    let events = link.events().subscribe();

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(LinkEvent::Frame { frame, source }) => {
                if let Some(msgids) = &args.msgid {
                    if !msgids.contains(&frame.msgid) {
                        continue;
                    }
                }

                print_frame(&frame, source, link.channel(), session.format);
                printed = printed.saturating_add(1);

                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Ok(LinkEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                info!(%url, "link closed");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    link.close();
    Ok(SUCCESS)
}
