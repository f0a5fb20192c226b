//! Voice markup documents.
//!
//! A [`ResponsePlan`] is an ordered list of directives built by the call-flow
//! engine; [`ResponsePlan::render`] turns it into the XML document the
//! provider executes. Rendering is deterministic (same plan, same bytes) and
//! validates the plan first: a document that neither gathers input nor ends
//! the call would strand the caller, so it is rejected before transmission.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::MarkupError;

/// Maximum characters per spoken prompt. The provider's TTS rejects longer
/// runs; handler output is truncated to fit before planning.
pub const MAX_SAY_LENGTH: usize = 500;

/// Voice used for all spoken prompts.
pub const DEFAULT_VOICE: &str = "alice";

/// Input mode for a gather directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherMode {
    Digits,
    Speech,
    SpeechAndDigits,
}

impl GatherMode {
    fn as_str(self) -> &'static str {
        match self {
            GatherMode::Digits => "dtmf",
            GatherMode::Speech => "speech",
            GatherMode::SpeechAndDigits => "speech dtmf",
        }
    }

    fn parse(value: &str) -> Result<Self, MarkupError> {
        match value {
            "dtmf" => Ok(GatherMode::Digits),
            "speech" => Ok(GatherMode::Speech),
            "speech dtmf" => Ok(GatherMode::SpeechAndDigits),
            other => Err(MarkupError::Malformed(format!(
                "unknown gather input mode: {other}"
            ))),
        }
    }
}

/// One atomic instruction in a voice response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Speak the text to the caller.
    Say { text: String },
    /// Collect caller input and post it to `action`. An optional nested
    /// prompt is spoken while the provider listens.
    Gather {
        mode: GatherMode,
        timeout_secs: u32,
        action: String,
        prompt: Option<String>,
    },
    /// Silence for the given number of seconds.
    Pause { seconds: u32 },
    /// Hand the call off to another document URL.
    Redirect { url: String },
    /// End the call.
    Hangup,
}

impl Directive {
    pub fn say(text: impl Into<String>) -> Self {
        Directive::Say { text: text.into() }
    }

    fn kind(&self) -> &'static str {
        match self {
            Directive::Say { .. } => "say",
            Directive::Gather { .. } => "gather",
            Directive::Pause { .. } => "pause",
            Directive::Redirect { .. } => "redirect",
            Directive::Hangup => "hangup",
        }
    }

    /// Whether a plan may end on this directive: it must either wait for
    /// input or terminate the call.
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            Directive::Gather { .. } | Directive::Redirect { .. } | Directive::Hangup
        )
    }
}

/// Shorten text to fit one spoken prompt, marking the cut with an ellipsis.
pub fn truncate_for_speech(text: &str) -> String {
    if text.chars().count() <= MAX_SAY_LENGTH {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(MAX_SAY_LENGTH - 3).collect();
    shortened.push_str("...");
    shortened
}

/// An ordered sequence of directives for one webhook response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePlan {
    directives: Vec<Directive>,
}

impl ResponsePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Check the plan invariants without rendering.
    pub fn validate(&self) -> Result<(), MarkupError> {
        let last = self.directives.last().ok_or(MarkupError::EmptyPlan)?;
        if !last.is_terminal() {
            return Err(MarkupError::MissingTerminal {
                last: last.kind().to_string(),
            });
        }
        for directive in &self.directives {
            let spoken = match directive {
                Directive::Say { text } => Some(text),
                Directive::Gather {
                    prompt: Some(text), ..
                } => Some(text),
                _ => None,
            };
            if let Some(text) = spoken {
                let length = text.chars().count();
                if length > MAX_SAY_LENGTH {
                    return Err(MarkupError::SpeechTooLong {
                        length,
                        max: MAX_SAY_LENGTH,
                    });
                }
            }
        }
        Ok(())
    }

    /// Render the plan as a markup document. Validates first; directive
    /// order is preserved exactly and all text is escaped by the writer.
    pub fn render(&self) -> Result<String, MarkupError> {
        self.validate()?;

        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| MarkupError::Xml(e.to_string()))?;
        writer
            .write_event(Event::Start(BytesStart::new("Response")))
            .map_err(|e| MarkupError::Xml(e.to_string()))?;

        for directive in &self.directives {
            write_directive(&mut writer, directive)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("Response")))
            .map_err(|e| MarkupError::Xml(e.to_string()))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| MarkupError::Xml(e.to_string()))
    }

    /// Parse a rendered document back into its directive sequence.
    ///
    /// Inverse of [`ResponsePlan::render`] for documents this module
    /// produces; used by tests and diagnostic tooling.
    pub fn parse(doc: &str) -> Result<Self, MarkupError> {
        let mut reader = Reader::from_str(doc);
        reader.config_mut().trim_text(true);

        let mut plan = ResponsePlan::new();
        let mut text = String::new();
        let mut gather: Option<(GatherMode, u32, String, Option<String>)> = None;

        loop {
            match reader.read_event() {
                Err(e) => return Err(MarkupError::Xml(e.to_string())),
                Ok(Event::Eof) => break,
                Ok(Event::Decl(_)) => {}
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"Response" => {}
                    b"Say" => text.clear(),
                    b"Redirect" => text.clear(),
                    b"Gather" => {
                        gather = Some(parse_gather_attrs(&e)?);
                    }
                    other => {
                        return Err(MarkupError::Malformed(format!(
                            "unexpected element: {}",
                            String::from_utf8_lossy(other)
                        )));
                    }
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"Hangup" => plan.push(Directive::Hangup),
                    b"Pause" => plan.push(Directive::Pause {
                        seconds: parse_attr_u32(&e, b"length")?,
                    }),
                    other => {
                        return Err(MarkupError::Malformed(format!(
                            "unexpected element: {}",
                            String::from_utf8_lossy(other)
                        )));
                    }
                },
                Ok(Event::Text(t)) => {
                    text = t
                        .unescape()
                        .map_err(|e| MarkupError::Xml(e.to_string()))?
                        .into_owned();
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"Say" => {
                        if let Some(ctx) = gather.as_mut() {
                            ctx.3 = Some(std::mem::take(&mut text));
                        } else {
                            plan.push(Directive::Say {
                                text: std::mem::take(&mut text),
                            });
                        }
                    }
                    b"Redirect" => plan.push(Directive::Redirect {
                        url: std::mem::take(&mut text),
                    }),
                    b"Gather" => {
                        let (mode, timeout_secs, action, prompt) =
                            gather.take().ok_or_else(|| {
                                MarkupError::Malformed("unmatched Gather end tag".to_string())
                            })?;
                        plan.push(Directive::Gather {
                            mode,
                            timeout_secs,
                            action,
                            prompt,
                        });
                    }
                    b"Response" => {}
                    _ => {}
                },
                Ok(_) => {}
            }
        }

        Ok(plan)
    }
}

fn write_directive(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    directive: &Directive,
) -> Result<(), MarkupError> {
    let xml = |e: quick_xml::Error| MarkupError::Xml(e.to_string());

    match directive {
        Directive::Say { text } => write_say(writer, text)?,
        Directive::Gather {
            mode,
            timeout_secs,
            action,
            prompt,
        } => {
            let mut elem = BytesStart::new("Gather");
            elem.push_attribute(("input", mode.as_str()));
            elem.push_attribute(("timeout", timeout_secs.to_string().as_str()));
            elem.push_attribute(("action", action.as_str()));
            elem.push_attribute(("method", "POST"));
            writer.write_event(Event::Start(elem)).map_err(xml)?;
            if let Some(prompt) = prompt {
                write_say(writer, prompt)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("Gather")))
                .map_err(xml)?;
        }
        Directive::Pause { seconds } => {
            let mut elem = BytesStart::new("Pause");
            elem.push_attribute(("length", seconds.to_string().as_str()));
            writer.write_event(Event::Empty(elem)).map_err(xml)?;
        }
        Directive::Redirect { url } => {
            writer
                .write_event(Event::Start(BytesStart::new("Redirect")))
                .map_err(xml)?;
            writer
                .write_event(Event::Text(BytesText::new(url)))
                .map_err(xml)?;
            writer
                .write_event(Event::End(BytesEnd::new("Redirect")))
                .map_err(xml)?;
        }
        Directive::Hangup => {
            writer
                .write_event(Event::Empty(BytesStart::new("Hangup")))
                .map_err(xml)?;
        }
    }
    Ok(())
}

fn write_say(writer: &mut Writer<Cursor<Vec<u8>>>, text: &str) -> Result<(), MarkupError> {
    let xml = |e: quick_xml::Error| MarkupError::Xml(e.to_string());
    let mut elem = BytesStart::new("Say");
    elem.push_attribute(("voice", DEFAULT_VOICE));
    writer.write_event(Event::Start(elem)).map_err(xml)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml)?;
    writer
        .write_event(Event::End(BytesEnd::new("Say")))
        .map_err(xml)?;
    Ok(())
}

fn parse_gather_attrs(
    elem: &BytesStart<'_>,
) -> Result<(GatherMode, u32, String, Option<String>), MarkupError> {
    let mut mode = None;
    let mut timeout = None;
    let mut action = None;

    for attr in elem.attributes() {
        let attr = attr.map_err(|e| MarkupError::Xml(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| MarkupError::Xml(e.to_string()))?
            .into_owned();
        match attr.key.as_ref() {
            b"input" => mode = Some(GatherMode::parse(&value)?),
            b"timeout" => {
                timeout = Some(value.parse::<u32>().map_err(|_| {
                    MarkupError::Malformed(format!("invalid gather timeout: {value}"))
                })?);
            }
            b"action" => action = Some(value),
            _ => {}
        }
    }

    let mode = mode.ok_or_else(|| MarkupError::Malformed("gather missing input mode".into()))?;
    let timeout =
        timeout.ok_or_else(|| MarkupError::Malformed("gather missing timeout".into()))?;
    let action = action.ok_or_else(|| MarkupError::Malformed("gather missing action".into()))?;
    Ok((mode, timeout, action, None))
}

fn parse_attr_u32(elem: &BytesStart<'_>, name: &[u8]) -> Result<u32, MarkupError> {
    for attr in elem.attributes() {
        let attr = attr.map_err(|e| MarkupError::Xml(e.to_string()))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| MarkupError::Xml(e.to_string()))?;
            return value.parse::<u32>().map_err(|_| {
                MarkupError::Malformed(format!(
                    "invalid {} attribute: {value}",
                    String::from_utf8_lossy(name)
                ))
            });
        }
    }
    Err(MarkupError::Malformed(format!(
        "missing {} attribute",
        String::from_utf8_lossy(name)
    )))
}

/// Render the single-reply document for an inbound text message.
pub fn render_message_reply(body: &str) -> Result<String, MarkupError> {
    let xml = |e: quick_xml::Error| MarkupError::Xml(e.to_string());
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml)?;
    writer
        .write_event(Event::Start(BytesStart::new("Response")))
        .map_err(xml)?;
    writer
        .write_event(Event::Start(BytesStart::new("Message")))
        .map_err(xml)?;
    writer
        .write_event(Event::Text(BytesText::new(body)))
        .map_err(xml)?;
    writer
        .write_event(Event::End(BytesEnd::new("Message")))
        .map_err(xml)?;
    writer
        .write_event(Event::End(BytesEnd::new("Response")))
        .map_err(xml)?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| MarkupError::Xml(e.to_string()))
}
