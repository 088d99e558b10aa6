use async_trait::async_trait;
use teloxide::{
    Bot,
    payloads::{SendMessageSetters, SendPhotoSetters},
    requests::{Request, Requester},
    types::{ChatId, InputFile, MessageId, Recipient, ThreadId},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Destino das mensagens: alertas de mudança de estado e relatório semanal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError>;

    /// Envia uma imagem silenciosamente, com legenda.
    async fn send_image(&self, caption: &str, image: Vec<u8>) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
    thread_id: Option<ThreadId>,
}

impl TelegramNotifier {
    pub fn new(api_token: String, chat_id: &str, thread_id: Option<i32>) -> Self {
        Self {
            bot: Bot::new(api_token),
            recipient: parse_recipient(chat_id),
            thread_id: thread_id.map(|id| ThreadId(MessageId(id))),
        }
    }
}

/// `chat_id` numérico vira `ChatId`; qualquer outro valor é tratado como `@canal`.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.to_owned()),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let mut request = self.bot.send_message(self.recipient.clone(), text);
        if let Some(thread_id) = self.thread_id {
            request = request.message_thread_id(thread_id);
        }
        request.send().await?;
        Ok(())
    }

    async fn send_image(&self, caption: &str, image: Vec<u8>) -> Result<(), NotifyError> {
        let photo = InputFile::memory(image).file_name("weekly_stats.png");
        let mut request = self
            .bot
            .send_photo(self.recipient.clone(), photo)
            .caption(caption)
            .disable_notification(true);
        if let Some(thread_id) = self.thread_id {
            request = request.message_thread_id(thread_id);
        }
        request.send().await?;
        Ok(())
    }
}
