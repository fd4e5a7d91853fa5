//! End-to-end exercise of the pure rules: admission → moderation →
//! synthesis input → context, with no store in the loop.

use blank_core::{
    Context, CycleClock, CycleStatus, Entry, EntryStatus, Error, PolicyTable, Persona, Slot,
    SubmissionRequest, Synthesis, Tier, Verdict, admit, moderation,
};

const TIER3_AUTHOR: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
const TIER1_AUTHOR: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

fn admit_at(
    author: &str,
    text: &str,
    core: bool,
    balance: f64,
    clock: &CycleClock,
    now: i64,
) -> blank_core::Result<blank_core::NewEntry> {
    admit(
        &SubmissionRequest {
            author_id: author,
            text,
            requested_core_memory: core,
            measured_balance: balance,
        },
        &PolicyTable::default(),
        clock.cycle_at(now),
        blank_core::time::unix_to_iso8601(now),
    )
}

#[test]
fn core_memory_scenario() {
    let clock = CycleClock::default();
    let now = clock.cycle_start(7) + 3600;

    let core = admit_at(
        TIER3_AUTHOR,
        "I think the project should slow down",
        true,
        250_000.0,
        &clock,
        now,
    )
    .unwrap();
    assert!(core.is_core_memory);
    assert_eq!(core.tier, Tier::Three);
    assert_eq!(core.cycle_number, 7);

    let long = "a".repeat(300);
    let err = admit_at(TIER1_AUTHOR, &long, false, 15_000.0, &clock, now).unwrap_err();
    assert!(matches!(err, Error::TextTooLong { max: 280, len: 300, .. }));

    let mut approved: Entry = core.into_entry();
    assert_eq!(approved.status, EntryStatus::Pending);
    approved.status = moderation::apply(approved.status, Verdict::Approve).unwrap();
    assert_eq!(approved.status, EntryStatus::Approved);
    assert!(approved.is_core_memory);

    let persona = Persona::default();
    let req = persona.synthesis_request(7, std::slice::from_ref(&approved), std::slice::from_ref(&approved));
    assert!(req.messages[0].content.contains("Tier III CORE"));

    let synthesis = Synthesis::from_generated(7, "I want to slow down.", 1, "t".into()).unwrap();
    assert_eq!(synthesis.source_submission_count, 1);

    let ctx = Context::assemble(7, vec![approved.clone()], Some(synthesis), vec![approved]);
    assert_eq!(ctx.status, CycleStatus::Formed);
    let prompt = persona.terminal_prompt(&ctx);
    assert!(prompt.section(Slot::Synthesis).unwrap().contains("slow down"));
    assert!(prompt.section(Slot::EmptyCycle).is_none());
}

#[test]
fn requested_core_below_tier_three_never_becomes_core() {
    let clock = CycleClock::default();
    let now = clock.cycle_start(2);
    for balance in [10_000.0, 60_000.0] {
        match admit_at(TIER1_AUTHOR, "keep this", true, balance, &clock, now) {
            Ok(entry) => assert!(!entry.is_core_memory),
            Err(e) => assert!(matches!(e, Error::CoreMemoryNotEligible { .. })),
        }
    }
}

#[test]
fn cycle_assignment_follows_the_clock() {
    let clock = CycleClock::default();
    let late = clock.cycle_start(3) - 1;
    let early = clock.cycle_start(3);
    let a = admit_at(TIER1_AUTHOR, "late", false, 10_000.0, &clock, late).unwrap();
    let b = admit_at(TIER1_AUTHOR, "early", false, 10_000.0, &clock, early).unwrap();
    assert_eq!(a.cycle_number, 2);
    assert_eq!(b.cycle_number, 3);
}
