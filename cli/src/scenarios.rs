//! Preset task lists. Static sample data; loading one replaces the whole task queue.

use once_cell::sync::Lazy;

use crate::types::{EnergyLevel, Priority, Scenario, TaskDraft};

pub static SCENARIOS: Lazy<Vec<Scenario>> = Lazy::new(build_scenarios);

pub fn find(id: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.id == id)
}

pub fn initial_tasks() -> Vec<TaskDraft> {
    vec![
        draft("Deep Work: Q3 Roadmap Strategy", Priority::High, 90, EnergyLevel::High),
        locked("Team Standup", Priority::Medium, 15, EnergyLevel::Low),
        draft("Email Triage & Slack", Priority::Low, 30, EnergyLevel::Low),
        draft("Review User Interview Notes", Priority::High, 45, EnergyLevel::Medium),
        draft("Sync with Engineering Lead", Priority::Medium, 30, EnergyLevel::Medium),
        draft("Draft PRD for Mobile Search", Priority::High, 60, EnergyLevel::High),
        draft("Backlog Grooming", Priority::Medium, 45, EnergyLevel::Low),
    ]
}

fn draft(title: &str, priority: Priority, minutes: u32, energy: EnergyLevel) -> TaskDraft {
    TaskDraft { energy_required: energy, ..TaskDraft::new(title, priority, minutes) }
}

fn locked(title: &str, priority: Priority, minutes: u32, energy: EnergyLevel) -> TaskDraft {
    TaskDraft { locked: Some(true), ..draft(title, priority, minutes, energy) }
}

fn build_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            id: "pm_busy",
            name: "Product Manager",
            role: "PM",
            icon: "🚀",
            tasks: vec![
                draft("Deep Work: Q3 Roadmap Strategy", Priority::High, 90, EnergyLevel::High),
                locked("Team Standup", Priority::Medium, 15, EnergyLevel::Low),
                draft("Email Triage & Slack", Priority::Low, 30, EnergyLevel::Low),
                draft("Review User Interview Notes", Priority::High, 45, EnergyLevel::Medium),
                draft("Sync with Engineering Lead", Priority::Medium, 30, EnergyLevel::Medium),
                draft("Draft PRD for Mobile Search", Priority::High, 60, EnergyLevel::High),
            ],
        },
        Scenario {
            id: "dev_sprint",
            name: "Software Engineer",
            role: "Dev",
            icon: "💻",
            tasks: vec![
                draft("Fix Critical Auth Bug", Priority::High, 60, EnergyLevel::High),
                locked("Daily Standup", Priority::Medium, 15, EnergyLevel::Low),
                draft("Code Review (Team PRs)", Priority::Medium, 45, EnergyLevel::Medium),
                draft("Feature Implementation: Dark Mode", Priority::High, 120, EnergyLevel::High),
                draft("Update Documentation", Priority::Low, 30, EnergyLevel::Low),
                draft("Deployment Pipeline Check", Priority::Medium, 20, EnergyLevel::Medium),
            ],
        },
        Scenario {
            id: "student_finals",
            name: "University Student",
            role: "Student",
            icon: "📚",
            tasks: vec![
                draft("Review Calculus Lectures", Priority::High, 90, EnergyLevel::High),
                draft("Practice Problem Set", Priority::High, 60, EnergyLevel::High),
                draft("Group Study Call", Priority::Medium, 60, EnergyLevel::Medium),
                draft("Flashcards: History", Priority::Medium, 30, EnergyLevel::Low),
                draft("Quick Nap", Priority::Low, 20, EnergyLevel::Low),
                draft("Outline Term Paper", Priority::Medium, 45, EnergyLevel::Medium),
            ],
        },
        Scenario {
            id: "creator_video",
            name: "Content Creator",
            role: "Creator",
            icon: "📹",
            tasks: vec![
                draft("Script Writing: New Video", Priority::High, 90, EnergyLevel::High),
                draft("Record B-Roll Footage", Priority::Medium, 60, EnergyLevel::Medium),
                draft("Edit Main Cut", Priority::High, 120, EnergyLevel::High),
                draft("Design Thumbnails", Priority::Medium, 45, EnergyLevel::Medium),
                draft("Reply to Comments", Priority::Low, 30, EnergyLevel::Low),
                draft("Sponsor Email Replies", Priority::Medium, 30, EnergyLevel::Low),
            ],
        },
        Scenario {
            id: "founder_fundraising",
            name: "Startup Founder",
            role: "Founder",
            icon: "🦄",
            tasks: vec![
                draft("Refine Pitch Deck", Priority::High, 60, EnergyLevel::High),
                locked("Investor Meeting: VC Firm A", Priority::High, 60, EnergyLevel::High),
                draft("Investor Meeting: Angel B", Priority::High, 45, EnergyLevel::High),
                draft("Team All-Hands", Priority::Medium, 45, EnergyLevel::Medium),
                draft("Sign Legal Docs", Priority::High, 15, EnergyLevel::Low),
                draft("Review Product KPIs", Priority::Medium, 30, EnergyLevel::Medium),
            ],
        },
        Scenario {
            id: "freelance_designer",
            name: "Freelance Designer",
            role: "Designer",
            icon: "🎨",
            tasks: vec![
                locked("Client A: Brand Discovery Call", Priority::High, 60, EnergyLevel::Medium),
                draft("Logo Sketching Phase 1", Priority::High, 90, EnergyLevel::High),
                draft("Client B: Feedback Revisions", Priority::Medium, 45, EnergyLevel::Medium),
                draft("Invoicing & Admin", Priority::Low, 30, EnergyLevel::Low),
                draft("Portfolio Update", Priority::Low, 60, EnergyLevel::Medium),
            ],
        },
        Scenario {
            id: "sales_closing",
            name: "Sales Executive",
            role: "Sales",
            icon: "💼",
            tasks: vec![
                draft("Cold Call Block", Priority::High, 60, EnergyLevel::High),
                locked("Demo: Enterprise Prospect", Priority::High, 45, EnergyLevel::High),
                draft("Contract Negotiation Call", Priority::High, 30, EnergyLevel::High),
                draft("Update CRM", Priority::Medium, 30, EnergyLevel::Low),
                draft("Draft Proposals", Priority::Medium, 45, EnergyLevel::Medium),
                draft("Pipeline Review", Priority::Low, 30, EnergyLevel::Low),
            ],
        },
        Scenario {
            id: "parent_weekend",
            name: "Stay-at-Home Parent",
            role: "Parent",
            icon: "🏡",
            tasks: vec![
                draft("Morning Routine & Breakfast", Priority::High, 60, EnergyLevel::Medium),
                locked("School Drop-off", Priority::High, 30, EnergyLevel::Low),
                draft("Grocery Run", Priority::Medium, 60, EnergyLevel::Medium),
                draft("House Cleaning", Priority::Low, 45, EnergyLevel::Low),
                draft("Meal Prep", Priority::Medium, 60, EnergyLevel::Medium),
                draft("Budget Planning", Priority::Medium, 30, EnergyLevel::High),
            ],
        },
    ]
}
