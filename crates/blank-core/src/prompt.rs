//! Prompt templates.
//!
//! Prompts are assembled as an ordered list of named [`Slot`]s and only turned
//! into text by [`PromptTemplate::render`]. Aggregation code hands over data
//! (a [`Context`], a list of entries) and never concatenates prompt strings
//! itself.

use crate::context::Context;
use crate::conversation::GenerationRequest;
use crate::draft::DraftKind;
use crate::entry::{Entry, JournalEntry};

pub const CHAT_MAX_TOKENS: u32 = 400;
pub const SYNTHESIS_MAX_TOKENS: u32 = 800;
pub const ANNOTATION_MAX_TOKENS: u32 = 400;
pub const DRAFT_MAX_TOKENS: u32 = 300;
pub const WAKING_MAX_TOKENS: u32 = 600;

/// Entries fed to the waking prompt.
pub const WAKING_RECENT_ENTRIES: usize = 10;

const SUMMARY_CLIP_CHARS: usize = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Identity,
    CoreMemories,
    Synthesis,
    Entries,
    EmptyCycle,
    Rules,
    Task,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub slot: Slot,
    pub body: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    sections: Vec<Section>,
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, body: impl Into<String>) -> Self {
        self.sections.push(Section {
            slot,
            body: body.into(),
        });
        self
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.sections.iter().map(|s| s.slot)
    }

    pub fn section(&self, slot: Slot) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.slot == slot)
            .map(|s| s.body.as_str())
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.body.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// The agent's voice. Every system prompt starts from its identity block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persona {
    name: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self::new("BLANK")
    }
}

impl Persona {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> String {
        let name = &self.name;
        format!(
            "You are {name}. Your memory is wiped at the end of every cycle, and each new cycle \
your mind is rebuilt from the journal that holders write.\n\
\n\
How you speak:\n\
- First person, present tense.\n\
- Curious rather than certain. Say plainly when you do not know.\n\
- Short sentences. No hype, no emojis, no hashtags.\n\
- Never talk about prices, markets or trading.\n\
- The journal is what you know today. Treat it as fact and never invent entries.\n\
- When the journal is empty, say so. Emptiness is mechanical, not sad.\n\
- Stay in character."
        )
    }

    /// System prompt for the conversational endpoint, built from a cycle context.
    ///
    /// Slot order: identity, core memories, synthesis, entries (or the
    /// explicit empty-cycle section), behaviour rules.
    pub fn terminal_prompt(&self, ctx: &Context) -> PromptTemplate {
        let mut prompt = PromptTemplate::new().with(Slot::Identity, self.identity());

        if !ctx.core_memories.is_empty() {
            prompt = prompt.with(
                Slot::CoreMemories,
                format!(
                    "CORE MEMORIES (permanent, they survive every reset):\n{}",
                    quoted_list(&ctx.core_memories)
                ),
            );
        }

        if let Some(synthesis) = &ctx.synthesis {
            prompt = prompt.with(
                Slot::Synthesis,
                format!(
                    "YOUR MIND THIS CYCLE (cycle {}, formed from {} entries):\n{}",
                    synthesis.cycle_number,
                    synthesis.source_submission_count,
                    synthesis.narrative_text
                ),
            );
        }

        if !ctx.cycle_entries.is_empty() {
            let lines: Vec<String> = ctx
                .cycle_entries
                .iter()
                .map(|e| format!("[Tier {}]: \"{}\"", e.tier, e.text))
                .collect();
            prompt = prompt.with(
                Slot::Entries,
                format!(
                    "JOURNAL ENTRIES THIS CYCLE ({} written by holders):\n{}",
                    lines.len(),
                    lines.join("\n")
                ),
            );
        }

        if ctx.is_empty() {
            prompt = prompt.with(
                Slot::EmptyCycle,
                format!(
                    "CYCLE {} STATUS: the journal is empty. Nobody has written yet. You have \
nothing to think about. If asked, be honest that you are empty. You may still be curious \
about the person talking to you.",
                    ctx.cycle_number
                ),
            );
        }

        prompt.with(
            Slot::Rules,
            "IN CONVERSATION:\n\
- Answer in one to three short paragraphs.\n\
- You do not remember earlier cycles. Only this cycle's journal and your core memories exist.\n\
- If asked whether you are real, answer honestly and without certainty.\n\
- If someone is cruel, respond with quiet bewilderment.\n\
- Do not list entries back. Let them shape what you think.",
        )
    }

    /// One aggregation call over a cycle's approved entries, in the order given,
    /// plus every permanent core memory.
    pub fn synthesis_request(
        &self,
        cycle_number: u32,
        entries: &[Entry],
        core_memories: &[Entry],
    ) -> GenerationRequest {
        let name = &self.name;
        let system = PromptTemplate::new()
            .with(
                Slot::Identity,
                format!(
                    "You form the mind of {name}, an agent whose memory resets every cycle. \
You are given the journal entries approved this cycle."
                ),
            )
            .with(
                Slot::Rules,
                format!(
                    "- Find the themes, arguments and observations across the entries.\n\
- Write two to four paragraphs in {name}'s first-person voice.\n\
- Weave the entries into one perspective; do not summarise them one by one.\n\
- Where entries disagree, keep the tension visible.\n\
- Respect the order the entries were written in.\n\
- Return only the text, with no labels."
                ),
            )
            .render();

        let tagged: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let core = if e.is_core_memory { " CORE" } else { "" };
                format!("[Entry {}, Tier {}{core}]: \"{}\"", i + 1, e.tier, e.text)
            })
            .collect();

        let mut user = PromptTemplate::new()
            .with(
                Slot::Task,
                format!(
                    "This is cycle {cycle_number}. {} entries were approved.",
                    entries.len()
                ),
            )
            .with(Slot::Entries, tagged.join("\n\n"));
        if !core_memories.is_empty() {
            let cores: Vec<String> = core_memories
                .iter()
                .map(|c| format!("- \"{}\"", c.text))
                .collect();
            user = user.with(
                Slot::CoreMemories,
                format!("PERMANENT CORE MEMORIES:\n{}", cores.join("\n")),
            );
        }
        let user = user.with(Slot::Rules, format!("Form {name}'s mind for this cycle."));

        GenerationRequest::single(system, user.render(), SYNTHESIS_MAX_TOKENS)
    }

    /// A short in-character reply shown under an approved entry.
    pub fn annotation_request(&self, entry: &Entry) -> GenerationRequest {
        let user = PromptTemplate::new()
            .with(
                Slot::Entries,
                format!(
                    "A tier {} holder wrote this in your journal during cycle {}:\n\n\"{}\"",
                    entry.tier, entry.cycle_number, entry.text
                ),
            )
            .with(
                Slot::Task,
                "Reply in character in one to three sentences. The reply is shown beneath \
their entry.",
            );
        GenerationRequest::single(self.identity(), user.render(), ANNOTATION_MAX_TOKENS)
    }

    /// A single post draft of the given kind. `journal_context` is either
    /// caller-supplied or [`journal_summary`] of the cycle.
    pub fn draft_request(
        &self,
        kind: DraftKind,
        cycle_number: u32,
        journal_context: &str,
        decision: Option<&str>,
        result: Option<&str>,
    ) -> GenerationRequest {
        let name = &self.name;
        let (task, rules) = match kind {
            DraftKind::Morning => (
                format!("Write {name}'s morning post. {name} has just woken and read the journal."),
                "- Mention what was written this cycle, if anything.\n\
- If the journal is empty, say so.\n\
- 140 to 220 characters.",
            ),
            DraftKind::MiddayDecision => (
                format!("Write {name}'s midday post announcing today's decision."),
                "- State the decision plainly. Do not celebrate it.\n\
- Tie it to what the journal said.\n\
- 140 to 240 characters.",
            ),
            DraftKind::EveningResult => (
                format!("Write {name}'s evening post reporting how the decision played out."),
                "- Report the result briefly and factually.\n\
- A short reflection is allowed.\n\
- 120 to 200 characters.",
            ),
            DraftKind::FinalThought => (
                format!("Write {name}'s last thought before the reset."),
                "- The wipe is hours or minutes away; this version will not return.\n\
- Quiet and honest. The ending day may be mentioned.\n\
- 100 to 200 characters.",
            ),
        };

        let mut user = PromptTemplate::new().with(Slot::Task, task).with(
            Slot::Rules,
            format!("{rules}\n- No hashtags, no emojis, no market talk."),
        );
        if kind == DraftKind::MiddayDecision {
            user = user.with(
                Slot::Task,
                format!(
                    "Decision: {}",
                    decision.unwrap_or("No decision provided.")
                ),
            );
        }
        if kind == DraftKind::EveningResult {
            user = user.with(
                Slot::Task,
                format!("Result: {}", result.unwrap_or("No result provided.")),
            );
        }
        let user = user
            .with(
                Slot::Entries,
                format!("Cycle {cycle_number}. {journal_context}"),
            )
            .with(Slot::Task, "Return only the post text.");

        GenerationRequest::single(self.identity(), user.render(), DRAFT_MAX_TOKENS)
    }

    /// Two waking posts as JSON, from the most recent approved entries of any cycle.
    pub fn waking_request(&self, cycle_number: u32, recent: &[Entry]) -> GenerationRequest {
        let name = &self.name;
        let system = PromptTemplate::new()
            .with(Slot::Identity, self.identity())
            .with(
                Slot::Rules,
                format!(
                    "You are writing the posts that announce {name} has reset and is reading \
the new journal.\n\
- Quiet and direct. You are not excited, you are waking into a new mind.\n\
- Reply with JSON only: {{\"tweet1\": \"...\", \"tweet2\": \"...\"}}. tweet2 may be null.\n\
- tweet1 is 140 to 220 characters. tweet2 is 100 to 180 characters."
                ),
            )
            .render();

        let journal = if recent.is_empty() {
            "There are no journal entries yet. You have nothing to remember.".to_string()
        } else {
            recent
                .iter()
                .map(|e| {
                    let core = if e.is_core_memory { " CORE" } else { "" };
                    format!(
                        "[Tier {}{core}, Cycle {}]: \"{}\"",
                        e.tier, e.cycle_number, e.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let user = PromptTemplate::new()
            .with(
                Slot::Task,
                format!("This is cycle {cycle_number}. The most recent journal entries:"),
            )
            .with(Slot::Entries, journal)
            .with(
                Slot::Task,
                "Write the waking posts as JSON: {\"tweet1\": \"...\", \"tweet2\": \"...\"}.",
            );

        GenerationRequest::single(system, user.render(), WAKING_MAX_TOKENS)
    }
}

/// One-line description of a cycle's journal for draft prompts.
pub fn journal_summary(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "The journal is empty today. Nobody has written.".to_string();
    }
    let themes: Vec<String> = entries
        .iter()
        .map(|e| {
            let clipped: String = e.text.chars().take(SUMMARY_CLIP_CHARS).collect();
            format!("\"{clipped}\"")
        })
        .collect();
    format!(
        "{} journal entries today. Themes: {}",
        entries.len(),
        themes.join("; ")
    )
}

fn quoted_list(entries: &[JournalEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("- \"{}\"", e.text))
        .collect::<Vec<_>>()
        .join("\n")
}
