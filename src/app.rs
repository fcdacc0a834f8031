use std::{collections::HashSet, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::{Handle, Runtime},
    sync::{mpsc, Mutex},
};

use crate::{
    api::{
        payloads::{MediaSource, OutgoingContent},
        rest::RestChatApi,
        ChatApi,
    },
    cli::{Cli, Command},
    domain::{self, events::SessionEvent, message::ReactionKind},
    infra::{self, config::AppConfig, error::AppError},
    sync::{self, poller::MessagePoller},
    usecases::{
        self,
        bootstrap,
        chat_session::ChatSession,
        context::SessionContext,
        send_message::SendMessageCommand,
    },
};

pub fn run(cli: Cli) -> Result<()> {
    let config = bootstrap::bootstrap(cli.config.as_deref())?;

    tracing::debug!(
        domain = domain::module_name(),
        api = crate::api::module_name(),
        usecases = usecases::module_name(),
        sync = sync::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let context = resolve_session(&cli, &config)?;
    let Command::Open { chat_id } = cli.command.clone();

    let runtime = Runtime::new()?;
    runtime.block_on(run_open(&config, context, &chat_id))
}

/// CLI flags win over the config file; both empty is a startup error.
fn resolve_session(cli: &Cli, config: &AppConfig) -> Result<SessionContext, AppError> {
    let user_id = cli
        .user_id
        .clone()
        .unwrap_or_else(|| config.session.user_id.clone());
    let access_token = cli
        .token
        .clone()
        .unwrap_or_else(|| config.session.access_token.clone());

    if user_id.is_empty() {
        return Err(AppError::MissingCredential("user_id"));
    }
    if access_token.is_empty() {
        return Err(AppError::MissingCredential("access_token"));
    }

    Ok(SessionContext::new(user_id, access_token))
}

async fn run_open(config: &AppConfig, context: SessionContext, chat_id: &str) -> Result<()> {
    let api: Arc<dyn ChatApi> = Arc::new(RestChatApi::new(&config.server)?);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let session = ChatSession::open(api, context, events_tx, chat_id)
        .await
        .map_err(|error| anyhow!("could not open chat {chat_id}: {error:?}"))?;
    let session = Arc::new(Mutex::new(session));

    let _poller = MessagePoller::start(
        &Handle::current(),
        Arc::clone(&session),
        Duration::from_millis(config.sync.poll_interval_ms),
    );

    let mut printed: HashSet<String> = HashSet::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    {
        let session = session.lock().await;
        let name = session.chat().display_name(&session.context().user_id);
        println!("Opened \"{name}\" ({chat_id}). Type a message, or /help for commands.");
    }

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    None => break,
                    Some(SessionEvent::MessagesUpdated) | Some(SessionEvent::ScrollToLatest) => {
                        print_new_messages(&mut printed, &*session.lock().await);
                    }
                    Some(SessionEvent::RosterUpdated) => {
                        let session = session.lock().await;
                        let roster = session.roster();
                        let names: Vec<&str> = roster
                            .participants()
                            .iter()
                            .map(|p| p.user.fullname.as_str())
                            .collect();
                        match roster.admin_id() {
                            Some(admin) => println!("-- roster: {} (admin: {admin})", names.join(", ")),
                            None => println!("-- roster: {}", names.join(", ")),
                        }
                    }
                    Some(SessionEvent::OperationFailed { code }) => {
                        eprintln!("!! operation failed: {code}");
                    }
                }
            }
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    None => {}
                    Some(Input::Quit) => break,
                    Some(Input::Help) => print_help(),
                    Some(input) => apply_input(&session, input).await,
                }
            }
        }
    }

    Ok(())
}

/// One line of operator input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Send(String),
    SendMedia(OutgoingContent),
    Reply { parent_id: String, body: String },
    Resend(String),
    React { message_id: String, kind: ReactionKind },
    Unreact(String),
    Pin { message_id: String, pinned: bool },
    Edit { message_id: String, content: String },
    Delete { message_id: String, for_everyone: bool },
    Add(Vec<String>),
    Remove(String),
    DeleteChat,
    Switch(String),
    Pins,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(Input::Send(line.to_owned()));
    }

    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    match (command, rest.as_slice()) {
        ("/quit", _) => Some(Input::Quit),
        ("/help", _) => Some(Input::Help),
        ("/reply", [parent_id, body @ ..]) if !body.is_empty() => Some(Input::Reply {
            parent_id: (*parent_id).to_owned(),
            body: body.join(" "),
        }),
        ("/resend", [message_id]) => Some(Input::Resend((*message_id).to_owned())),
        ("/send-image", [reference, caption @ ..]) => Some(Input::SendMedia(OutgoingContent::Image {
            source: MediaSource::from_reference(reference),
            caption: join_caption(caption),
        })),
        ("/send-video", [reference, caption @ ..]) => Some(Input::SendMedia(OutgoingContent::Video {
            source: MediaSource::from_reference(reference),
            caption: join_caption(caption),
        })),
        ("/send-audio", [reference]) => Some(Input::SendMedia(OutgoingContent::Audio {
            source: MediaSource::from_reference(reference),
        })),
        ("/send-file", [reference, caption @ ..]) => Some(Input::SendMedia(OutgoingContent::File {
            source: MediaSource::from_reference(reference),
            caption: join_caption(caption),
        })),
        ("/react", [message_id, kind]) => Some(Input::React {
            message_id: (*message_id).to_owned(),
            kind: parse_reaction(kind)?,
        }),
        ("/unreact", [message_id]) => Some(Input::Unreact((*message_id).to_owned())),
        ("/pin", [message_id]) => Some(Input::Pin {
            message_id: (*message_id).to_owned(),
            pinned: true,
        }),
        ("/unpin", [message_id]) => Some(Input::Pin {
            message_id: (*message_id).to_owned(),
            pinned: false,
        }),
        ("/edit", [message_id, content @ ..]) if !content.is_empty() => Some(Input::Edit {
            message_id: (*message_id).to_owned(),
            content: content.join(" "),
        }),
        ("/delete", [message_id]) => Some(Input::Delete {
            message_id: (*message_id).to_owned(),
            for_everyone: false,
        }),
        ("/delete-all", [message_id]) => Some(Input::Delete {
            message_id: (*message_id).to_owned(),
            for_everyone: true,
        }),
        ("/add", user_ids) if !user_ids.is_empty() => {
            Some(Input::Add(user_ids.iter().map(|id| (*id).to_owned()).collect()))
        }
        ("/remove", [user_id]) => Some(Input::Remove((*user_id).to_owned())),
        ("/delete-chat", []) => Some(Input::DeleteChat),
        ("/switch", [chat_id]) => Some(Input::Switch((*chat_id).to_owned())),
        ("/pins", []) => Some(Input::Pins),
        _ => None,
    }
}

fn join_caption(words: &[&str]) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn parse_reaction(raw: &str) -> Option<ReactionKind> {
    match raw.to_ascii_lowercase().as_str() {
        "like" => Some(ReactionKind::Like),
        "love" => Some(ReactionKind::Love),
        "laugh" => Some(ReactionKind::Laugh),
        "sad" => Some(ReactionKind::Sad),
        "angry" => Some(ReactionKind::Angry),
        _ => None,
    }
}

async fn apply_input(session: &Arc<Mutex<ChatSession>>, input: Input) {
    let mut session = session.lock().await;

    let outcome: Result<(), String> = match input {
        Input::Send(body) => session
            .send(SendMessageCommand {
                reply_to: None,
                content: OutgoingContent::Text { body },
            })
            .await
            .map_err(|error| format!("{error:?}")),
        Input::SendMedia(content) => session
            .send(SendMessageCommand {
                reply_to: None,
                content,
            })
            .await
            .map_err(|error| format!("{error:?}")),
        Input::Reply { parent_id, body } => session
            .send(SendMessageCommand {
                reply_to: Some(parent_id),
                content: OutgoingContent::Text { body },
            })
            .await
            .map_err(|error| format!("{error:?}")),
        Input::Resend(message_id) => session
            .resend(&message_id)
            .await
            .map_err(|error| format!("{error:?}")),
        Input::React { message_id, kind } => {
            session.react(&message_id, kind).await;
            Ok(())
        }
        Input::Unreact(message_id) => {
            session.remove_reaction(&message_id).await;
            Ok(())
        }
        Input::Pin { message_id, pinned } => {
            session.set_pinned(&message_id, pinned).await;
            Ok(())
        }
        Input::Edit { message_id, content } => {
            session.edit(&message_id, &content).await;
            Ok(())
        }
        Input::Delete {
            message_id,
            for_everyone,
        } => {
            session.delete(&message_id, for_everyone).await;
            Ok(())
        }
        Input::Add(user_ids) => session
            .add_participants(&user_ids)
            .await
            .map_err(|error| format!("{error:?}")),
        Input::Remove(user_id) => session
            .remove_participant(&user_id)
            .await
            .map_err(|error| format!("{error:?}")),
        Input::DeleteChat => session
            .delete_chat()
            .await
            .map_err(|error| format!("{error:?}")),
        Input::Switch(chat_id) => session
            .switch_chat(&chat_id)
            .await
            .map_err(|error| format!("{error:?}")),
        Input::Pins => {
            for message in session.store().pinned() {
                println!("* [{}] {}", message.id, message.display_content());
            }
            Ok(())
        }
        Input::Help | Input::Quit => Ok(()),
    };

    if let Err(reason) = outcome {
        eprintln!("!! {reason}");
    }
}

fn print_new_messages(printed: &mut HashSet<String>, session: &ChatSession) {
    for message in session.store().messages() {
        if printed.insert(message.id.clone()) {
            let sender = message
                .sender
                .as_ref()
                .map(|u| u.fullname.as_str())
                .unwrap_or(message.sender_id.as_str());
            let marker = if message.status.is_in_flight() {
                " (sending...)"
            } else if message.status.can_resend() {
                " (failed, /resend to retry)"
            } else {
                ""
            };
            println!(
                "[{}] {}: {}{marker}",
                message.id,
                sender,
                message.display_content()
            );
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <text>                    send a message");
    println!("  /reply <id> <text>        reply to a message");
    println!("  /send-image <ref> [text]  send an image (file path or URL)");
    println!("  /send-video <ref> [text]  send a video");
    println!("  /send-audio <ref>         send an audio clip");
    println!("  /send-file <ref> [text]   send a file");
    println!("  /resend <id>              retry a failed message");
    println!("  /react <id> <kind>        toggle a reaction (like|love|laugh|sad|angry)");
    println!("  /unreact <id>             remove your reaction");
    println!("  /pin <id>, /unpin <id>    pin or unpin a message");
    println!("  /edit <id> <text>         edit a message");
    println!("  /delete <id>              delete for me");
    println!("  /delete-all <id>          delete for everyone");
    println!("  /add <user>...            add participants (group admin)");
    println!("  /remove <user>            remove a participant (group admin)");
    println!("  /delete-chat              delete the chat");
    println!("  /switch <chat>            open another chat");
    println!("  /pins                     list pinned messages");
    println!("  /quit                     exit");
}
