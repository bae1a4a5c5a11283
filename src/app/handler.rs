//! The quote bot: the consumer that sits on top of the IRC engine.
//!
//! It joins one channel, answers channel chatter with canned quotes (each with
//! its own cooldown), takes a handful of commands and echoes DCC CHAT lines.

use crate::app::event::DccSessionId;
use crate::app::quote::Quote;
use crate::config::AppConfig;
use crate::dcc::parser::DccSendOffer;
use crate::irc::commands::{parse_command, strip_address, BotCommand};
use crate::irc::dispatcher::{Context, Handler};
use crate::irc::tracker::Tracker;
use std::net::IpAddr;
use std::time::Instant;
use tracing::{debug, info};

const DISCONNECT_MESSAGE: &str = "I'll be back!";
const DIE_MESSAGE: &str = "Bye, cruel world!";

pub struct QuoteBot {
    channel: String,
    quotes: Vec<Quote>,
}

impl QuoteBot {
    pub fn new(channel: &str, quotes: Vec<Quote>) -> Self {
        Self {
            channel: channel.to_string(),
            quotes,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.channel, config.quotes.iter().map(Quote::from).collect())
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Reply in `channel` with every quote `text` triggers.
    pub fn match_quotes(
        &mut self,
        ctx: &mut Context<'_>,
        channel: &str,
        text: &str,
        now: Instant,
    ) {
        for quote in &mut self.quotes {
            if !quote.matches(text) {
                continue;
            }
            match quote.fire(text, now) {
                Some(reply) => ctx.send_private_message(channel, reply),
                None => debug!(
                    search = quote.search(),
                    "quote matched, but not enough time elapsed"
                ),
            }
        }
    }

    fn do_command(&mut self, ctx: &mut Context<'_>, nick: &str, input: &str) {
        let Some(command) = parse_command(input) else {
            return;
        };
        info!(%nick, ?command, "command");

        match command {
            BotCommand::Disconnect => ctx.disconnect(DISCONNECT_MESSAGE),
            BotCommand::Die => ctx.terminate(DIE_MESSAGE),
            BotCommand::Stats => {
                for line in stats_lines(ctx.tracker()) {
                    ctx.send_notice(nick, &line);
                }
            }
            BotCommand::Dcc => ctx.listen_dcc(nick),
            BotCommand::Unknown(cmd) => ctx.send_notice(nick, &format!("Not understood: {}", cmd)),
        }
    }
}

/// NOTICE lines describing every joined channel, channels and nicks sorted.
pub fn stats_lines(tracker: &Tracker) -> Vec<String> {
    let mut names = tracker.channel_names();
    names.sort();

    let mut lines = Vec::new();
    for name in names {
        let Some(channel) = tracker.channel(&name) else {
            continue;
        };
        let sorted = |mut nicks: Vec<String>| {
            nicks.sort();
            nicks.join(", ")
        };
        lines.push("--- Channel statistics ---".to_string());
        lines.push(format!("Channel: {}", channel.name()));
        lines.push(format!("Users: {}", sorted(channel.users())));
        lines.push(format!("Opers: {}", sorted(channel.opers())));
        lines.push(format!("Voiced: {}", sorted(channel.voiced())));
    }
    lines
}

impl Handler for QuoteBot {
    fn on_welcome(&mut self, ctx: &mut Context<'_>) {
        ctx.join(&self.channel);
    }

    fn on_nickname_in_use(&mut self, ctx: &mut Context<'_>, nickname: &str) {
        // The session already retries with a suffixed nickname.
        debug!(%nickname, current = ctx.nickname(), "nickname in use");
    }

    fn on_private_message(&mut self, ctx: &mut Context<'_>, source: &str, text: &str) {
        self.do_command(ctx, source, text);
    }

    fn on_channel_message(
        &mut self,
        ctx: &mut Context<'_>,
        source: &str,
        channel: &str,
        text: &str,
    ) {
        let nickname = ctx.nickname().to_string();
        if let Some(command) = strip_address(text, &nickname) {
            self.do_command(ctx, source, command);
            return;
        }
        self.match_quotes(ctx, channel, text, Instant::now());
    }

    fn on_dcc_chat_invite(
        &mut self,
        ctx: &mut Context<'_>,
        source: &str,
        address: IpAddr,
        port: u16,
    ) {
        info!(%source, %address, port, "accepting DCC CHAT invite");
        ctx.connect_dcc(address, port);
    }

    fn on_dcc_send_offer(&mut self, _ctx: &mut Context<'_>, source: &str, offer: &DccSendOffer) {
        info!(
            %source,
            filename = %offer.filename,
            size = offer.size,
            "ignoring DCC SEND offer"
        );
    }

    fn on_dcc_message(&mut self, ctx: &mut Context<'_>, session: DccSessionId, text: &str) {
        ctx.send_dcc(session, &format!("You said: {}", text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::action::Action;
    use crate::app::event::Event;
    use crate::irc::dispatcher::dispatch;
    use crate::irc::message::Message;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn bot() -> QuoteBot {
        QuoteBot::new(
            "#goats",
            vec![
                Quote::new("lunch", "nom nom", Duration::from_secs(60)),
                Quote::new(">.>", "<.<", Duration::from_secs(300)),
            ],
        )
    }

    fn tracker() -> Tracker {
        let mut tracker = Tracker::new();
        for line in [
            ":bot!b@h JOIN #goats",
            ":srv.net 353 bot = #goats :bot @carol +dave alice",
            ":bot!b@h JOIN #alpha",
            ":erin!e@h JOIN #alpha",
            ":srv.net MODE #alpha +o erin",
        ] {
            tracker.update("bot", &Message::parse(line).unwrap());
        }
        tracker
    }

    fn run(bot: &mut QuoteBot, tracker: &Tracker, event: Event) -> Vec<Action> {
        let mut ctx = Context::new("bot", tracker);
        dispatch(&event, bot, &mut ctx);
        ctx.into_actions()
    }

    fn notices(actions: &[Action]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(msg) if msg.command.is("NOTICE") => msg.param(1).map(str::to_string),
                _ => None,
            })
            .collect()
    }

    fn private(text: &str) -> Event {
        Event::PrivateMessage {
            source: "alice".into(),
            text: text.into(),
        }
    }

    #[test]
    fn joins_channel_on_welcome() {
        let tracker = Tracker::new();
        let actions = run(&mut bot(), &tracker, Event::Welcome);
        assert_eq!(actions, vec![Action::Send(Message::join("#goats"))]);
    }

    #[test]
    fn stats_lists_sorted_snapshot() {
        let tracker = tracker();
        let actions = run(&mut bot(), &tracker, private("stats"));
        assert_eq!(
            notices(&actions),
            vec![
                "--- Channel statistics ---",
                "Channel: #alpha",
                "Users: bot, erin",
                "Opers: erin",
                "Voiced: ",
                "--- Channel statistics ---",
                "Channel: #goats",
                "Users: alice, bot, carol, dave",
                "Opers: carol",
                "Voiced: dave",
            ]
        );
        assert!(actions.iter().all(|a| matches!(
            a,
            Action::Send(msg) if msg.param(0) == Some("alice")
        )));
    }

    #[test]
    fn disconnect_and_die() {
        let tracker = Tracker::new();
        assert_eq!(
            run(&mut bot(), &tracker, private("disconnect")),
            vec![Action::Disconnect {
                message: "I'll be back!".into()
            }]
        );
        assert_eq!(
            run(&mut bot(), &tracker, private("die")),
            vec![Action::Terminate {
                message: "Bye, cruel world!".into()
            }]
        );
    }

    #[test]
    fn dcc_command_offers_chat() {
        let tracker = Tracker::new();
        assert_eq!(
            run(&mut bot(), &tracker, private("dcc")),
            vec![Action::ListenDcc {
                nick: "alice".into()
            }]
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        let tracker = Tracker::new();
        let actions = run(&mut bot(), &tracker, private("dance"));
        assert_eq!(notices(&actions), vec!["Not understood: dance"]);
    }

    #[test]
    fn addressed_channel_command() {
        let tracker = tracker();
        let actions = run(
            &mut bot(),
            &tracker,
            Event::ChannelMessage {
                source: "alice".into(),
                channel: "#goats".into(),
                text: "bot: die".into(),
            },
        );
        assert_eq!(
            actions,
            vec![Action::Terminate {
                message: "Bye, cruel world!".into()
            }]
        );
    }

    #[test]
    fn addressed_chatter_is_not_a_command() {
        let tracker = tracker();
        let actions = run(
            &mut bot(),
            &tracker,
            Event::ChannelMessage {
                source: "alice".into(),
                channel: "#goats".into(),
                text: "bot: die hard is my favourite movie".into(),
            },
        );
        assert_eq!(
            actions,
            vec![Action::Send(Message::notice(
                "alice",
                "Not understood: die hard is my favourite movie"
            ))]
        );
    }

    #[test]
    fn quote_cooldown_limits_replies() {
        let tracker = Tracker::new();
        let mut bot = bot();
        let start = Instant::now();

        let mut ctx = Context::new("bot", &tracker);
        bot.match_quotes(&mut ctx, "#goats", "lunch time", start);
        bot.match_quotes(&mut ctx, "#goats", "lunch!!", start + Duration::from_secs(10));
        assert_eq!(
            ctx.into_actions(),
            vec![Action::Send(Message::privmsg("#goats", "nom nom"))]
        );

        let mut ctx = Context::new("bot", &tracker);
        bot.match_quotes(&mut ctx, "#goats", "lunch?", start + Duration::from_secs(61));
        assert_eq!(ctx.actions().len(), 1);
    }

    #[test]
    fn one_line_can_fire_several_quotes() {
        let tracker = Tracker::new();
        let mut ctx = Context::new("bot", &tracker);
        bot().match_quotes(&mut ctx, "#goats", ">.> lunch", Instant::now());
        assert_eq!(
            ctx.into_actions(),
            vec![
                Action::Send(Message::privmsg("#goats", "nom nom")),
                Action::Send(Message::privmsg("#goats", "<.<")),
            ]
        );
    }

    #[test]
    fn dcc_invite_and_echo() {
        let tracker = Tracker::new();
        let mut bot = bot();
        assert_eq!(
            run(
                &mut bot,
                &tracker,
                Event::DccChatInvite {
                    source: "alice".into(),
                    address: IpAddr::from([8, 8, 8, 8]),
                    port: 5000,
                }
            ),
            vec![Action::ConnectDcc {
                address: IpAddr::from([8, 8, 8, 8]),
                port: 5000
            }]
        );
        assert_eq!(
            run(
                &mut bot,
                &tracker,
                Event::DccMessage {
                    session: 3,
                    text: "hey".into()
                }
            ),
            vec![Action::SendDcc {
                session: 3,
                text: "You said: hey".into()
            }]
        );
    }

    #[test]
    fn builds_from_config() {
        let bot = QuoteBot::from_config(&AppConfig::default());
        assert_eq!(bot.channel(), "#SpaceGoatsChat");
        assert_eq!(bot.quotes.len(), 6);
    }
}
