//! 命令行参数与终端输出

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use pdf_quiz::models::{OptionLabel, Question, QuizResult};
use pdf_quiz::quiz::{AnswerFeedback, QuizSession};

#[derive(Parser, Debug)]
#[command(
    name = "pdf_quiz",
    about = "Generate multiple-choice questions from a PDF",
    version
)]
pub struct Cli {
    /// PDF file to generate questions from
    pub pdf: PathBuf,

    /// Number of questions to generate (3-100)
    #[arg(short = 'n', long, default_value_t = 5)]
    pub num_questions: usize,

    /// Take the quiz in the terminal after generation
    #[arg(long)]
    pub interactive: bool,

    /// Override the usage ledger location
    #[arg(long)]
    pub stats_file: Option<PathBuf>,

    /// Print the quiz as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Log each chunk's text as it is processed
    #[arg(short, long)]
    pub verbose: bool,
}

fn separator() -> String {
    "=".repeat(80)
}

pub fn print_banner(cli: &Cli) {
    println!("\n{}", separator());
    println!("MCQ Learning Assistant");
    println!("{}\n", separator());
    println!("📄 PDF: {}", cli.pdf.display());
    println!("❓ Questions: {}", cli.num_questions);
}

pub fn print_question(number: usize, question: &Question) {
    println!("\n{}", separator());
    println!("Question {} [{}]", number, question.difficulty());
    println!("{}", separator());
    println!("\n{}\n", question.text());
    for option in question.options() {
        println!("  {}", option);
    }
}

/// 打印全部题目及答案
pub fn print_quiz(quiz: &QuizResult) {
    println!(
        "\n✅ Generated {} questions from {} chunks",
        quiz.len(),
        quiz.metadata.num_chunks
    );

    for (i, question) in quiz.questions.iter().enumerate() {
        print_question(i + 1, question);
        println!("\n✓ Answer: {}", question.correct_answer());
        println!("💡 Hint: {}", question.hint());
        println!("📖 Explanation: {}", question.explanation());
    }

    println!("\n{}", separator());
    println!("✨ Done!");
    println!("{}\n", separator());
}

/// 终端答题：A-D 作答，n/p 翻页，f 交卷
pub fn run_interactive(quiz: Arc<QuizResult>) -> io::Result<()> {
    let mut session = QuizSession::new(quiz);
    if session.is_empty() {
        println!("No questions to play.");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let position = session.position();
        if let Some(question) = session.current() {
            print_question(position + 1, question);
        }
        if let Some(previous) = session.answer_for(position) {
            println!("\n(your answer: {})", previous);
        }

        print!("\n[A-D] answer, [n]ext, [p]revious, [f]inish > ");
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let input = line.trim();

        match input.to_ascii_lowercase().as_str() {
            "n" => {
                if !session.next() {
                    println!("Already at the last question.");
                }
            }
            "p" => {
                if !session.previous() {
                    println!("Already at the first question.");
                }
            }
            "f" => break,
            _ => match OptionLabel::parse(input) {
                Some(label) => {
                    if let Some(feedback) = session.answer(label) {
                        match &feedback {
                            AnswerFeedback::Correct { explanation } => {
                                println!("\n✅ Correct! {}", explanation)
                            }
                            AnswerFeedback::Incorrect { hint } => {
                                println!("\n❌ Not quite. 💡 Hint: {}", hint)
                            }
                        }
                        if feedback.is_correct() {
                            if session.is_last() {
                                println!("That was the last question, press f to finish.");
                            } else {
                                session.next();
                            }
                        }
                    }
                }
                None => println!("Unrecognized input: {:?}", input),
            },
        }
    }

    print_score(&session);
    Ok(())
}

fn print_score(session: &QuizSession) {
    let score = session.finish();
    println!("\n{}", separator());
    println!(
        "🏁 Score: {}/{} ({:.1}%), answered {}",
        score.correct,
        score.total,
        score.percentage,
        session.answered_count()
    );
    println!("{}", separator());

    for entry in session.review() {
        let mark = if entry.is_correct { "✅" } else { "❌" };
        let selected = entry
            .selected
            .map(|label| label.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} Q{}: yours {} / correct {} - {}",
            mark,
            entry.index + 1,
            selected,
            entry.question.correct_answer(),
            entry.question.text()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["pdf_quiz", "paper.pdf"]).unwrap();
        assert_eq!(cli.num_questions, 5);
        assert!(!cli.interactive);
        assert!(!cli.json);
        assert!(cli.stats_file.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "pdf_quiz",
            "paper.pdf",
            "-n",
            "12",
            "--interactive",
            "--json",
            "--stats-file",
            "/tmp/usage.json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.num_questions, 12);
        assert!(cli.interactive && cli.json && cli.verbose);
        assert_eq!(cli.stats_file, Some(PathBuf::from("/tmp/usage.json")));
    }
}
