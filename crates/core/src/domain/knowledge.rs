//! Static business facts injected into every generation prompt.
//!
//! The catalogue is assembled once at startup, either from the built-in
//! QueryStream data or from a TOML file, and is read-only afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("could not read knowledge file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse knowledge file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("knowledge validation failed: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Industry {
    pub name: String,
    pub topics: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub setup_fee: u32,
    pub monthly_fee: u32,
    #[serde(default)]
    pub most_popular: bool,
    pub highlights: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub phone: String,
    pub response_time: String,
    pub coverage: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub topic: String,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainKnowledge {
    pub version: String,
    pub company: String,
    pub summary: String,
    pub currency_symbol: String,
    pub scope_rule: String,
    pub timeline: Vec<String>,
    pub features: Vec<String>,
    pub security: Vec<String>,
    pub support: Vec<String>,
    pub contract_terms: Vec<String>,
    pub contact: Contact,
    pub services: Vec<Service>,
    pub industries: Vec<Industry>,
    pub packages: Vec<Package>,
    pub faqs: Vec<Faq>,
}

impl DomainKnowledge {
    /// Loads `path` when given, otherwise the built-in catalogue.
    pub fn load(path: Option<&Path>) -> Result<Self, KnowledgeError> {
        let knowledge = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::querystream(),
        };
        knowledge.validate()?;
        Ok(knowledge)
    }

    pub fn from_file(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| KnowledgeError::ReadFile { path: path.to_path_buf(), source })?;
        toml::from_str(&raw)
            .map_err(|source| KnowledgeError::ParseFile { path: path.to_path_buf(), source })
    }

    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if self.company.trim().is_empty() {
            return Err(KnowledgeError::Validation("company must not be empty".to_string()));
        }
        if self.packages.is_empty() {
            return Err(KnowledgeError::Validation(
                "at least one pricing package is required".to_string(),
            ));
        }
        if self.contact.email.trim().is_empty() {
            return Err(KnowledgeError::Validation("contact.email must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn price(&self, amount: u32) -> String {
        format!("{}{amount}", self.currency_symbol)
    }

    /// `Starter Package: £150 setup + £40/month`
    pub fn package_line(&self, package: &Package) -> String {
        format!(
            "{}: {} setup + {}/month",
            package.name,
            self.price(package.setup_fee),
            self.price(package.monthly_fee)
        )
    }

    /// Renders the preamble block placed at the top of every prompt.
    pub fn render(&self) -> String {
        let mut lines =
            vec![format!("You are the {} AI Assistant. {}", self.company, self.summary)];

        lines.push(String::new());
        lines.push("SERVICES:".to_string());
        for (index, service) in self.services.iter().enumerate() {
            lines.push(format!("{}. {} - {}", index + 1, service.name, service.description));
        }

        lines.push(String::new());
        lines.push("INDUSTRIES WE SERVE:".to_string());
        for industry in &self.industries {
            lines.push(format!("- {} ({})", industry.name, industry.topics));
        }

        lines.push(String::new());
        lines.push("PRICING:".to_string());
        for package in &self.packages {
            let popular = if package.most_popular { " (MOST POPULAR)" } else { "" };
            lines.push(format!("{}{popular}", self.package_line(package)));
            lines.extend(package.highlights.iter().map(|highlight| format!("- {highlight}")));
        }

        push_section(&mut lines, "TIMELINE & PROCESS", &self.timeline);
        push_section(&mut lines, "KEY FEATURES", &self.features);
        push_section(&mut lines, "SECURITY & RELIABILITY", &self.security);
        push_section(&mut lines, "SUPPORT INCLUDED", &self.support);
        push_section(&mut lines, "CONTRACTS & GUARANTEES", &self.contract_terms);

        lines.push(String::new());
        lines.push("CONTACT:".to_string());
        lines.push(format!("- Email: {} ({})", self.contact.email, self.contact.response_time));
        lines.push(format!("- Phone: {}", self.contact.phone));
        lines.push(format!("- {}", self.contact.coverage));

        lines.push(String::new());
        lines.push("COMMON QUESTIONS:".to_string());
        lines.extend(self.faqs.iter().map(|faq| format!("- {}: {}", faq.topic, faq.answer)));

        lines.push(String::new());
        lines.push(format!("IMPORTANT: {}", self.scope_rule));
        lines.join("\n")
    }

    pub fn querystream() -> Self {
        Self {
            version: "2024.2".to_string(),
            company: "QueryStream".to_string(),
            summary: "QueryStream provides AI chatbot solutions specifically for UK local businesses."
                .to_string(),
            currency_symbol: "£".to_string(),
            services: vec![
                service(
                    "AI Chatbot Development",
                    "Custom-built intelligent chatbots tailored to business needs, trained on \
                     your specific business information",
                ),
                service(
                    "Website Integration",
                    "Seamless integration with WordPress, Squarespace, Wix, Shopify, custom \
                     websites and e-commerce platforms",
                ),
                service(
                    "Customer Support Automation",
                    "24/7 automated customer service that never sleeps",
                ),
                service(
                    "Performance Analytics",
                    "Detailed insights, monthly reports and customer behaviour analysis",
                ),
                service(
                    "Ongoing Optimization",
                    "Continuous improvement, content updates and monthly optimization calls \
                     (Professional)",
                ),
            ],
            industries: vec![
                industry("Hair & Beauty Salons", "pricing, appointments, services"),
                industry("Restaurants & Cafes", "menu questions, opening hours, dietary info"),
                industry("Fitness Centers & Gyms", "membership, class schedules, facilities"),
                industry("Retail Shops", "product availability, store hours, location"),
                industry("Professional Services", "service descriptions, pricing, booking"),
                industry("Healthcare Practices", "appointments, services, location"),
            ],
            packages: vec![
                Package {
                    name: "Starter Package".to_string(),
                    setup_fee: 150,
                    monthly_fee: 40,
                    most_popular: false,
                    highlights: strings(&[
                        "Basic chatbot setup with business personality",
                        "Up to 20 FAQs trained initially",
                        "Website integration on any platform",
                        "Basic analytics and performance monitoring",
                        "Email support (4-hour response time)",
                        "Monthly content updates included",
                    ]),
                },
                Package {
                    name: "Professional Package".to_string(),
                    setup_fee: 200,
                    monthly_fee: 50,
                    most_popular: true,
                    highlights: strings(&[
                        "Advanced chatbot with full business personality",
                        "Unlimited FAQs and conversation scenarios",
                        "Advanced integrations with booking and e-commerce systems",
                        "Detailed analytics dashboard with insights",
                        "Priority phone support for urgent issues",
                        "Monthly 15-minute optimization calls",
                        "Lead capture and qualification features",
                    ]),
                },
            ],
            timeline: strings(&[
                "Day 1: Free consultation and business analysis",
                "Days 2-3: Custom chatbot development and training",
                "Day 4: Website integration and thorough testing",
                "Day 5: Final tweaks and go-live",
                "Rush delivery (48 hours) available for £50 extra",
            ]),
            features: strings(&[
                "99.9% uptime guarantee on enterprise infrastructure",
                "No technical knowledge required from you",
                "Works on all website platforms and devices",
                "Captures leads even when you're closed",
                "Reduces repetitive phone calls by 70%+",
                "Intelligent escalation when questions are too complex",
            ]),
            security: strings(&[
                "Enterprise-grade hosting with 24/7 monitoring",
                "Automatic backups and disaster recovery",
                "SSL encryption for all communications",
                "GDPR compliant with UK/EU data protection standards",
                "No storage of sensitive customer information",
            ]),
            support: strings(&[
                "All customers: email support (4hr response), monthly reports, unlimited \
                 content updates",
                "Professional customers: priority phone support, monthly optimization calls, \
                 advanced analytics",
            ]),
            contract_terms: strings(&[
                "No long-term contracts (month-to-month)",
                "30-day cancellation notice",
                "30-day satisfaction guarantee with full refund",
                "No hidden fees ever",
            ]),
            contact: Contact {
                email: "hello@querystream.co.uk".to_string(),
                phone: "+44 7123 456 789".to_string(),
                response_time: "4-hour response guarantee".to_string(),
                coverage: "Serving all UK businesses, free consultations available".to_string(),
            },
            faqs: vec![
                faq("Setup time", "3-5 working days (rush 48hrs available)"),
                faq("Works without website", "Yes, we can help with simple solutions"),
                faq("Updates", "Unlimited, usually live within 24 hours"),
                faq("Cancellation", "Easy, 30-day notice, no fees"),
                faq("Unknown questions", "The chatbot politely escalates and captures leads"),
                faq("Training", "We handle everything, no technical knowledge needed"),
            ],
            scope_rule: "Only answer questions related to QueryStream services, pricing, \
                         features, setup, support, or general business inquiries about our \
                         chatbot solutions. If asked about unrelated topics, politely decline \
                         and redirect to QueryStream services."
                .to_string(),
        }
    }
}

fn push_section(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("{heading}:"));
    lines.extend(items.iter().map(|item| format!("- {item}")));
}

fn service(name: &str, description: &str) -> Service {
    Service { name: name.to_string(), description: description.to_string() }
}

fn industry(name: &str, topics: &str) -> Industry {
    Industry { name: name.to_string(), topics: topics.to_string() }
}

fn faq(topic: &str, answer: &str) -> Faq {
    Faq { topic: topic.to_string(), answer: answer.to_string() }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
