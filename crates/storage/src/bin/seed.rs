use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use kumano_core::model::{
    ANSWER_COUNT, Lesson, LessonId, QuizItem, QuizItemId, VocabularyEntry, VocabularyId,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        // mode=rwc so a fresh checkout can seed without touching the file first.
        let mut db_url = std::env::var("KUMANO_DB_URL")
            .unwrap_or_else(|_| "sqlite://dev.sqlite3?mode=rwc".into());

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--help" | "-h" => {
                    eprintln!("Usage: seed [--db <sqlite_url>]");
                    std::process::exit(0);
                }
                other => return Err(ArgsError::UnknownArg(other.to_string())),
            }
        }

        Ok(Self { db_url })
    }
}

/// (kanji, pronunciation, romaji, meaning) per lesson, straight out of the
/// beginner course index.
const LESSON_VOCABULARY: &[(&str, &[(&str, &str, &str, &str)])] = &[
    (
        "Greetings",
        &[
            ("", "おはよう", "ohayou", "good morning"),
            ("", "こんにちは", "konnichiwa", "hello"),
            ("", "こんばんは", "konbanwa", "good evening"),
            ("", "さようなら", "sayounara", "goodbye"),
            ("", "ありがとう", "arigatou", "thank you"),
        ],
    ),
    (
        "Around Town",
        &[
            ("駅", "えき", "eki", "train station"),
            ("店", "みせ", "mise", "shop"),
            ("道", "みち", "michi", "road"),
            ("橋", "はし", "hashi", "bridge"),
            ("山", "やま", "yama", "mountain"),
        ],
    ),
    (
        "Food and Drink",
        &[
            ("水", "みず", "mizu", "water"),
            ("茶", "ちゃ", "cha", "tea"),
            ("魚", "さかな", "sakana", "fish"),
            ("米", "こめ", "kome", "rice"),
            ("肉", "にく", "niku", "meat"),
        ],
    ),
];

/// Builds a four-choice quiz item from one vocabulary entry, drawing the three
/// distractor meanings from the other entries of the same lesson.
fn quiz_item_from_vocabulary<R: Rng + ?Sized>(
    item_id: QuizItemId,
    entry: &VocabularyEntry,
    others: &[&VocabularyEntry],
    rng: &mut R,
) -> Result<QuizItem, Box<dyn std::error::Error>> {
    let mut distractors: Vec<&str> = others
        .iter()
        .filter(|other| other.id() != entry.id())
        .map(|other| other.meaning())
        .collect();
    distractors.shuffle(rng);
    distractors.truncate(ANSWER_COUNT - 1);

    let correct_index = rng.random_range(0..ANSWER_COUNT);
    let mut answers: Vec<String> = distractors.into_iter().map(str::to_owned).collect();
    answers.insert(correct_index, entry.meaning().to_owned());

    let question = format!("What does '{}' mean?", entry.romaji());
    Ok(QuizItem::new(
        item_id,
        entry.lesson_id(),
        question,
        answers,
        correct_index,
    )?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let mut rng = rand::rng();

    let mut vocab_id = 1_u64;
    let mut item_id = 1_u64;

    for (lesson_index, (title, words)) in LESSON_VOCABULARY.iter().enumerate() {
        let lesson_id = LessonId::new(lesson_index as u64 + 1);
        let lesson = Lesson::new(lesson_id, (*title).to_string(), None)?;
        storage.lessons.upsert_lesson(&lesson).await?;

        let mut entries = Vec::with_capacity(words.len());
        for (kanji, pronunciation, romaji, meaning) in *words {
            let kanji = (!kanji.is_empty()).then(|| (*kanji).to_string());
            entries.push(VocabularyEntry::new(
                VocabularyId::new(vocab_id),
                lesson_id,
                kanji,
                *pronunciation,
                *romaji,
                *meaning,
            )?);
            vocab_id += 1;
        }
        storage.vocabulary.add_entries(&entries).await?;

        let refs: Vec<&VocabularyEntry> = entries.iter().collect();
        for entry in &entries {
            let item = quiz_item_from_vocabulary(QuizItemId::new(item_id), entry, &refs, &mut rng)?;
            storage.items.create_item(&item).await?;
            item_id += 1;
        }

        eprintln!(
            "seeded lesson {lesson_id} ({title}): {} words, {} quiz items",
            entries.len(),
            entries.len()
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
