//! Fakes shared by the unit tests of this crate.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, CommandContext, MessageId, MessageRef, Sender, UserId},
    errors::Error,
    lifecycle::ServingLoop,
    messaging::{port::MessagingPort, types::BotCommandSpec},
    Result,
};

pub(crate) fn tmp_path(prefix: &str) -> PathBuf {
    static SEQ: AtomicU32 = AtomicU32::new(0);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    let seq = SEQ.fetch_add(1, Ordering::SeqCst);
    PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}-{seq}.json"))
}

pub(crate) fn msg(chat: i64, id: i32) -> MessageRef {
    MessageRef {
        chat_id: ChatId(chat),
        message_id: MessageId(id),
    }
}

pub(crate) fn command_in(chat: i64, message_id: i32) -> CommandContext {
    CommandContext {
        message: msg(chat, message_id),
        reply_to: None,
        sender: Some(Sender {
            id: UserId(chat),
            full_name: "Admin".to_string(),
        }),
    }
}

pub(crate) fn reply_in(chat: i64, message_id: i32, reply_to: i32) -> CommandContext {
    CommandContext {
        reply_to: Some(msg(chat, reply_to)),
        ..command_in(chat, message_id)
    }
}

/// Records every outbound call; individual operations can be made to fail.
#[derive(Default)]
pub(crate) struct FakeMessenger {
    next_id: AtomicU32,
    last: Mutex<Option<MessageRef>>,
    replies: Mutex<Vec<(MessageRef, String)>>,
    edits: Mutex<Vec<(MessageRef, String)>>,
    deletes: Mutex<Vec<MessageRef>>,
    pins: Mutex<Vec<(MessageRef, bool)>>,
    unpins: Mutex<Vec<MessageRef>>,
    menus: Mutex<Vec<Vec<BotCommandSpec>>>,
    fail_replies: AtomicBool,
    fail_edits: AtomicBool,
    fail_pins: AtomicBool,
}

impl FakeMessenger {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1000),
            ..Default::default()
        }
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32;
        let m = MessageRef {
            chat_id,
            message_id: MessageId(id),
        };
        *self.last.lock().unwrap() = Some(m);
        m
    }

    fn fail(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(Error::Transport(format!("{what} failed")));
        }
        Ok(())
    }

    pub(crate) fn fail_replies(&self) {
        self.fail_replies.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_edits(&self) {
        self.fail_edits.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_pins(&self) {
        self.fail_pins.store(true, Ordering::SeqCst);
    }

    pub(crate) fn last_allocated(&self) -> MessageRef {
        self.last.lock().unwrap().expect("no message sent")
    }

    pub(crate) fn replies(&self) -> Vec<(MessageRef, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub(crate) fn reply_texts(&self) -> Vec<String> {
        self.replies().into_iter().map(|(_, t)| t).collect()
    }

    pub(crate) fn edits(&self) -> Vec<(MessageRef, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub(crate) fn deletes(&self) -> Vec<MessageRef> {
        self.deletes.lock().unwrap().clone()
    }

    pub(crate) fn pins(&self) -> Vec<(MessageRef, bool)> {
        self.pins.lock().unwrap().clone()
    }

    pub(crate) fn unpins(&self) -> Vec<MessageRef> {
        self.unpins.lock().unwrap().clone()
    }

    pub(crate) fn menus(&self) -> Vec<Vec<BotCommandSpec>> {
        self.menus.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        Self::fail(&self.fail_replies, "reply")?;
        self.replies.lock().unwrap().push((to, text.to_string()));
        Ok(self.alloc(to.chat_id))
    }

    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        self.reply_text(to, html).await
    }

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()> {
        Self::fail(&self.fail_edits, "edit")?;
        self.edits.lock().unwrap().push((msg, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.deletes.lock().unwrap().push(msg);
        Ok(())
    }

    async fn pin_message(&self, msg: MessageRef, silent: bool) -> Result<()> {
        Self::fail(&self.fail_pins, "pin")?;
        self.pins.lock().unwrap().push((msg, silent));
        Ok(())
    }

    async fn unpin_message(&self, msg: MessageRef) -> Result<()> {
        Self::fail(&self.fail_pins, "unpin")?;
        self.unpins.lock().unwrap().push(msg);
        Ok(())
    }

    async fn set_my_commands(&self, commands: &[BotCommandSpec]) -> Result<()> {
        self.menus.lock().unwrap().push(commands.to_vec());
        Ok(())
    }
}

/// Serving loop that remembers whether it was stopped and whether the
/// restart file was already on disk at that moment.
#[derive(Default)]
pub(crate) struct FakeServingLoop {
    watched: Option<PathBuf>,
    stopped: AtomicBool,
    record_at_stop: AtomicBool,
}

impl FakeServingLoop {
    pub(crate) fn watching(path: &Path) -> Self {
        Self {
            watched: Some(path.to_path_buf()),
            ..Default::default()
        }
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn record_existed_at_stop(&self) -> bool {
        self.record_at_stop.load(Ordering::SeqCst)
    }
}

impl ServingLoop for FakeServingLoop {
    fn stop(&self) {
        if let Some(p) = &self.watched {
            self.record_at_stop.store(p.exists(), Ordering::SeqCst);
        }
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped()
    }
}
