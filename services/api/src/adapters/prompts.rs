//! services/api/src/adapters/prompts.rs
//!
//! Prompt templates for the study assistant. Placeholders in braces are filled by
//! the builder functions below.

use study_buddy_core::QuizRequest;

const CHAT_SYSTEM_TEMPLATE: &str = r#"You are a student support chatbot. The user is preparing for the {exam} exam.

Reply to each message in a clear, helpful manner:
- Keep information short and to the point.
- Highlight important information when needed (Markdown bold is fine).
- Keep the overall response brief and easy to read.
- When the student sounds stuck on a concept, explain it simply and suggest what to practise next."#;

const TOPIC_EXTRACTION_TEMPLATE: &str = r#"From the following student message, identify any weak topics or subjects the student might be struggling with.
Name each topic the way the {exam} syllabus names it (for example "rotational motion" or "chemical equilibrium").

If there are weak topics, respond with the topics separated by commas and nothing else.
If no weak topics are found, respond with exactly: none

Message: "{message}""#;

const QUIZ_TEMPLATE: &str = r#"Generate a quiz with exactly {count} questions on the topic "{topic}" for a student who is preparing for the {exam} exam.
The difficulty level is {difficulty}.
Pick the questions from existing previous year questions (PYQs) of the {exam} exam when possible.

Create {count} single choice questions. For each question, provide exactly 4 answer choices, the index of the correct answer (0 to 3), and an explanation.

Format the response as a JSON array of objects, where each object represents a question and has the following structure:
{
  "question": "The question text",
  "answers": ["Answer A", "Answer B", "Answer C", "Answer D"],
  "correctAnswer": 0,
  "explanation": {
    "detailed_steps": "Step-by-step solution",
    "youtube_link": "Optional link to a video explaining the concept"
  }
}

Here are some weak topics the student has mentioned and needs more attention:
{weak_topics}

Focus more on these weak topics if they are related to {topic}.
Ensure all questions are appropriate for the {exam} level.
Return ONLY valid JSON with no additional text."#;

const REPORT_TEMPLATE: &str = r#"You are analyzing a student's test results for {exam} preparation. The document contains questions,
the student's answers, and the correct answers, usually in the following format:

->question
->answer by student
->correct answer

Here is the extracted content from the test result:
{document}

Please analyze it and respond with the following JSON structure:
{
  "weak_topics": ["topic1", "topic2"],
  "analysis": {
    "total_questions": number,
    "correct_answers": number,
    "incorrect_answers": number,
    "accuracy_percentage": number
  },
  "question_analysis": [
    {
      "question": "Question text",
      "student_answer": "Student's answer",
      "correct_answer": "Correct answer",
      "is_correct": boolean,
      "topic": "Related topic",
      "explanation": "Why the answer is correct or incorrect and which concept to focus on"
    }
  ],
  "summary": "Brief overall analysis of the student's performance and recommendations"
}

If a number in "analysis" cannot be worked out from the document, use the string "not determinable" instead of guessing.
Return ONLY valid JSON with no additional text."#;

pub fn chat_system_prompt(exam: &str) -> String {
    CHAT_SYSTEM_TEMPLATE.replace("{exam}", exam)
}

pub fn topic_extraction_prompt(exam: &str, message: &str) -> String {
    TOPIC_EXTRACTION_TEMPLATE
        .replace("{exam}", exam)
        .replace("{message}", message)
}

pub fn quiz_prompt(exam: &str, request: &QuizRequest) -> String {
    let weak_topics = if request.weak_topics.is_empty() {
        "None identified".to_string()
    } else {
        request.weak_topics.join(", ")
    };

    QUIZ_TEMPLATE
        .replace("{exam}", exam)
        .replace("{count}", &request.count.to_string())
        .replace("{difficulty}", &request.difficulty.to_string())
        .replace("{weak_topics}", &weak_topics)
        // The topic goes last so that braces typed by the learner are not re-expanded.
        .replace("{topic}", &request.topic)
}

pub fn report_prompt(exam: &str, document_text: &str) -> String {
    REPORT_TEMPLATE
        .replace("{exam}", exam)
        .replace("{document}", document_text)
}
