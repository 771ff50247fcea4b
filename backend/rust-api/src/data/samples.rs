use crate::models::{Difficulty, LearningModule, LearningTask, LessonRef, TaskType};

const LESSON_MINUTES: u32 = 45;
const TASKS_PER_LESSON: u32 = 3;

struct VideoSeed {
    id: &'static str,
    difficulty: Difficulty,
    priority: i32,
    xp: u32,
    gems: u32,
    question: &'static str,
    explanation: &'static str,
    youtube_video_id: &'static str,
    title: &'static str,
    description: &'static str,
    duration: u32,
}

const VIDEOS: [VideoSeed; 4] = [
    VideoSeed {
        id: "sample-video-1",
        difficulty: Difficulty::Easy,
        priority: 1,
        xp: 25,
        gems: 20,
        question: "ECG Interpretation Basics - Understanding Normal Rhythms",
        explanation: "This video covers the fundamentals of ECG interpretation and normal cardiac rhythms",
        youtube_video_id: "dEZ2pGJdvTg",
        title: "ECG Interpretation - Normal Rhythms",
        description: "Learn to identify normal ECG patterns and understand the basics of cardiac rhythm interpretation",
        duration: 480,
    },
    VideoSeed {
        id: "sample-video-2",
        difficulty: Difficulty::Medium,
        priority: 2,
        xp: 35,
        gems: 30,
        question: "Common Arrhythmias - Recognition and Clinical Significance",
        explanation: "Advanced tutorial on identifying and understanding common cardiac arrhythmias",
        youtube_video_id: "Knv6AeghK_Y",
        title: "Common Arrhythmias Identification",
        description: "Comprehensive guide to recognizing atrial fibrillation, ventricular tachycardia, and other common arrhythmias",
        duration: 720,
    },
    VideoSeed {
        id: "sample-video-3",
        difficulty: Difficulty::Hard,
        priority: 2,
        xp: 40,
        gems: 40,
        question: "STEMI Recognition - Identifying Heart Attacks on ECG",
        explanation: "Critical skills for identifying ST-elevation myocardial infarction patterns",
        youtube_video_id: "9wcWr_S5QZg",
        title: "STEMI Patterns and Recognition",
        description: "Learn to quickly identify ST-elevation patterns and understand their clinical implications",
        duration: 900,
    },
    VideoSeed {
        id: "sample-video-4",
        difficulty: Difficulty::Easy,
        priority: 1,
        xp: 20,
        gems: 15,
        question: "ECG Lead Placement and Troubleshooting",
        explanation: "Practical guide to proper ECG lead placement and common artifacts",
        youtube_video_id: "HB6S3MHr4fE",
        title: "Proper ECG Lead Placement",
        description: "Step-by-step guide to correct ECG electrode placement and artifact recognition",
        duration: 360,
    },
];

struct QuizSeed {
    id: &'static str,
    difficulty: Difficulty,
    xp: u32,
    question: &'static str,
    options: [&'static str; 4],
    answer: &'static str,
    explanation: &'static str,
}

const QUIZZES: [QuizSeed; 3] = [
    QuizSeed {
        id: "sample-quiz-1",
        difficulty: Difficulty::Easy,
        xp: 10,
        question: "What is the normal heart rate range for adults at rest?",
        options: ["60-100 bpm", "80-120 bpm", "40-80 bpm", "100-140 bpm"],
        answer: "60-100 bpm",
        explanation: "Normal adult resting heart rate is 60-100 beats per minute. Rates below 60 are bradycardia, above 100 are tachycardia.",
    },
    QuizSeed {
        id: "sample-quiz-2",
        difficulty: Difficulty::Medium,
        xp: 15,
        question: "Which lead provides the best view of the inferior wall of the heart?",
        options: ["Lead II", "Lead V1", "Lead aVF", "Lead V6"],
        answer: "Lead aVF",
        explanation: "Lead aVF, along with leads II and III, provides the best view of the inferior wall of the heart.",
    },
    QuizSeed {
        id: "sample-quiz-3",
        difficulty: Difficulty::Hard,
        xp: 25,
        question: "What does a prolonged QT interval increase the risk of?",
        options: [
            "Atrial fibrillation",
            "Torsades de pointes",
            "Complete heart block",
            "Sinus bradycardia",
        ],
        answer: "Torsades de pointes",
        explanation: "Prolonged QT interval is a major risk factor for torsades de pointes, a potentially fatal arrhythmia.",
    },
];

/// Built-in video tasks; also used to top up guest pools.
pub fn sample_videos() -> Vec<LearningTask> {
    VIDEOS
        .iter()
        .map(|seed| {
            let mut task = LearningTask::new(seed.id, TaskType::Video, seed.difficulty);
            task.priority = seed.priority;
            task.xp = seed.xp;
            task.gems = Some(seed.gems);
            task.question = Some(seed.question.to_string());
            task.explanation = Some(seed.explanation.to_string());
            task.correct_answer = Some("video-watched".to_string());
            task.youtube_video_id = Some(seed.youtube_video_id.to_string());
            task.video_title = Some(seed.title.to_string());
            task.video_description = Some(seed.description.to_string());
            task.video_duration = Some(seed.duration);
            task
        })
        .collect()
}

/// The full fallback pool: sample videos followed by sample quizzes.
pub fn sample_tasks() -> Vec<LearningTask> {
    let mut tasks = sample_videos();
    tasks.extend(QUIZZES.iter().map(|seed| {
        let mut task = LearningTask::new(seed.id, TaskType::Quiz, seed.difficulty);
        task.xp = seed.xp;
        task.question = Some(seed.question.to_string());
        task.options = seed.options.iter().map(|o| o.to_string()).collect();
        task.correct_answer = Some(seed.answer.to_string());
        task.explanation = Some(seed.explanation.to_string());
        task
    }));
    tasks
}

fn lessons(module_id: &str, titles: &[&str]) -> Vec<LessonRef> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| LessonRef {
            id: format!("{}-lesson-{}", module_id, index + 1),
            title: title.to_string(),
            order: index as u32 + 1,
            estimated_minutes: LESSON_MINUTES,
            task_count: TASKS_PER_LESSON,
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn module(
    id: &str,
    order: u32,
    title: &str,
    description: &str,
    category: &str,
    difficulty: &str,
    prerequisites: &[&str],
    lesson_titles: &[&str],
) -> LearningModule {
    LearningModule {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        difficulty: difficulty.to_string(),
        order,
        prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
        lessons: lessons(id, lesson_titles),
    }
}

/// Fallback catalog: a linear chain where each module requires the previous
/// one by title.
pub fn sample_modules() -> Vec<LearningModule> {
    vec![
        module(
            "module-1",
            1,
            "ECG Fundamentals",
            "Foundation knowledge for all ECG interpretation",
            "fundamentals",
            "beginner",
            &[],
            &[
                "Heart Anatomy & Sounds",
                "ECG Leads & Views",
                "ECG Paper & Measurements",
                "ECG Waveforms (P, QRS, T)",
                "Heart Rate Calculation",
                "Rhythm vs Rate",
                "Normal ECG Variations",
                "Artifact Recognition",
                "Systematic ECG Approach",
                "Practice: Normal ECGs",
            ],
        ),
        module(
            "module-2",
            2,
            "Sinus Rhythms & Atrial Rhythms",
            "Master sinus rhythms and common atrial arrhythmias",
            "arrhythmias",
            "intermediate",
            &["ECG Fundamentals"],
            &[
                "Normal Sinus Rhythm Criteria",
                "Sinus Bradycardia",
                "Sinus Tachycardia",
                "Sinus Arrhythmia",
                "Sinus Arrest and Pause",
                "Sick Sinus Syndrome",
                "Wandering Atrial Pacemaker",
                "Multifocal Atrial Tachycardia",
                "Premature Atrial Contractions",
                "Module 2 Mastery Assessment",
            ],
        ),
        module(
            "module-3",
            3,
            "Atrial Arrhythmias",
            "Atrial fibrillation, flutter and supraventricular tachycardias",
            "arrhythmias",
            "intermediate",
            &["Sinus Rhythms & Atrial Rhythms"],
            &[
                "Atrial Fibrillation Basics",
                "Atrial Flutter",
                "Supraventricular Tachycardia (SVT)",
                "Atrial Fibrillation with RVR",
                "Multifocal Atrial Tachycardia (MAT)",
                "Wolff-Parkinson-White (WPW) Syndrome",
                "Premature Atrial Contractions (PACs)",
                "Atrial Arrhythmias Integration",
            ],
        ),
        module(
            "module-4",
            4,
            "STEMI & NSTEMI",
            "Acute coronary syndrome recognition and management",
            "ischemia",
            "intermediate",
            &["Atrial Arrhythmias"],
            &[
                "STEMI Recognition Fundamentals",
                "NSTEMI and Unstable Angina Recognition",
                "Coronary Territory Mapping",
                "ECG Evolution in Acute MI",
                "STEMI Mimics and Differential Diagnosis",
                "ACS Risk Stratification and Management",
                "Complications and Post-MI ECG Changes",
                "Module 4 STEMI/NSTEMI Mastery Assessment",
            ],
        ),
    ]
}
