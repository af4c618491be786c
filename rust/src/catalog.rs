use serde::Serialize;
use std::collections::BTreeMap;

/// Immutable category data injected into the selector, prompt builder and
/// the `/categories` endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub domains: BTreeMap<String, Vec<String>>,
    pub missing_pieces: BTreeMap<String, String>,
    pub domain_categories: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// Builds a catalog from raw entries, dropping blank or duplicate names
    /// and any domain left without subdomains. Returns `None` when no usable
    /// domain or missing piece remains.
    pub fn from_entries(
        domains: Vec<(String, Vec<String>)>,
        missing_pieces: Vec<(String, String)>,
        domain_categories: Vec<(String, Vec<String>)>,
    ) -> Option<Self> {
        let mut domain_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, subdomains) in domains {
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            let entry = domain_map.entry(name).or_default();
            for subdomain in subdomains {
                let subdomain = subdomain.trim().to_string();
                if !subdomain.is_empty() && !entry.iter().any(|existing| existing == &subdomain) {
                    entry.push(subdomain);
                }
            }
        }
        domain_map.retain(|_, subdomains| !subdomains.is_empty());

        let mut piece_map = BTreeMap::new();
        for (label, description) in missing_pieces {
            let label = label.trim().to_string();
            if label.is_empty() {
                continue;
            }
            piece_map
                .entry(label)
                .or_insert_with(|| description.trim().to_string());
        }

        if domain_map.is_empty() || piece_map.is_empty() {
            return None;
        }

        let mut group_map = BTreeMap::new();
        for (group, members) in domain_categories {
            let group = group.trim().to_string();
            let members: Vec<String> = members
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| domain_map.contains_key(m))
                .collect();
            if !group.is_empty() && !members.is_empty() {
                group_map.insert(group, members);
            }
        }

        Some(Self {
            domains: domain_map,
            missing_pieces: piece_map,
            domain_categories: group_map,
        })
    }

    pub fn subdomains(&self, domain: &str) -> Option<&[String]> {
        self.domains.get(domain).map(Vec::as_slice)
    }

    pub fn missing_piece_description(&self, label: &str) -> Option<&str> {
        self.missing_pieces.get(label).map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let domains = DEFAULT_DOMAINS
            .iter()
            .map(|(name, subs)| {
                (
                    name.to_string(),
                    subs.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        let pieces = DEFAULT_MISSING_PIECES
            .iter()
            .map(|(label, desc)| (label.to_string(), desc.to_string()))
            .collect();
        let groups = DEFAULT_DOMAIN_CATEGORIES
            .iter()
            .map(|(group, members)| {
                (
                    group.to_string(),
                    members.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect();

        Self {
            domains,
            missing_pieces: pieces,
            domain_categories: groups,
        }
    }
}

const DEFAULT_DOMAINS: &[(&str, &[&str])] = &[
    (
        "CRM",
        &[
            "Niche CRM",
            "Lead Management",
            "Customer Support",
            "Sales Pipeline",
            "Contact Management",
            "Customer Feedback Management",
        ],
    ),
    (
        "ERP",
        &[
            "ERP for Small Manufacturing",
            "Inventory Management",
            "Production Management",
            "Finance Management",
            "Supply Chain Management",
        ],
    ),
    (
        "Business Automation",
        &[
            "Workflow Automation",
            "Subscription Management",
            "Time Tracking",
            "Project Management",
            "Service Business Management",
        ],
    ),
    (
        "Marketing",
        &[
            "Email Marketing",
            "Social Media Management",
            "Content Creation",
            "Marketing Automation",
            "SEO Tools",
            "Affiliate Marketing",
        ],
    ),
    (
        "Analytics",
        &[
            "Social Media Analytics",
            "E-commerce Analytics",
            "Marketing Analytics",
            "Business Intelligence",
            "Customer Analytics",
            "Performance Tracking",
        ],
    ),
    (
        "Sales",
        &[
            "Sales Pipeline",
            "Lead Generation",
            "Cold Outreach",
            "Sales Automation",
            "Customer Relationship Management",
        ],
    ),
    (
        "E-commerce",
        &[
            "Headless E-commerce",
            "Subscription Box Management",
            "E-commerce Personalization",
            "Smart Inventory Management",
            "Omnichannel Retail",
            "Custom Apparel Inventory",
        ],
    ),
    (
        "Retail",
        &[
            "Dropshipping Automation",
            "Return Management",
            "Pricing Optimization",
            "Digital Punch Card Tool",
            "Abandoned Cart Recovery",
        ],
    ),
    (
        "Finance",
        &[
            "Expense Management",
            "Payroll Automation",
            "Robo-Advisory",
            "Credit Scoring",
            "Crypto Tax Reporting",
            "Invoice Factoring",
            "Financial Management",
        ],
    ),
    (
        "Accounting",
        &[
            "AI Expense Tracking",
            "Financial Planning",
            "Tax Management",
            "Budgeting Tools",
            "Investment Management",
        ],
    ),
    (
        "FinTech",
        &[
            "Compliance-as-a-Service",
            "Peer-to-Peer Lending",
            "Automated Investment",
            "Personal Finance",
            "B2B Financial Services",
        ],
    ),
    (
        "Health",
        &[
            "Telehealth Platform",
            "Chronic Condition Management",
            "Mental Wellness",
            "Healthcare Diagnostics",
            "Health Protocol Compliance",
        ],
    ),
    (
        "Wellness",
        &[
            "Personalized Meditation",
            "AI Nutrition Coaching",
            "Employee Wellness",
            "Virtual Fitness Classes",
            "Sleep Optimization",
            "Spa & Wellness Management",
        ],
    ),
    (
        "Fitness",
        &[
            "Micro-Gym Booking",
            "Virtual Fitness Management",
            "Fitness Tracking",
            "Workout Planning",
            "Health Monitoring",
        ],
    ),
    (
        "Productivity",
        &[
            "Project Management",
            "Task Management",
            "Team Collaboration",
            "Document Management",
            "Workflow Automation",
        ],
    ),
    (
        "Communication",
        &[
            "Video Conferencing",
            "Team Chat",
            "File Sharing",
            "Scheduling",
            "Email Management",
            "Real-time Communication",
        ],
    ),
    (
        "Remote Work",
        &[
            "Remote Team Collaboration",
            "Time Zone Scheduler",
            "Cloud Storage",
            "Digital Whiteboard",
            "Freelancer Project Suite",
        ],
    ),
    (
        "Real Estate",
        &[
            "Property Management",
            "IoT Property Management",
            "Property Investment",
            "Tenant Screening",
            "Online Rent Collection",
            "Maintenance Request Management",
        ],
    ),
    (
        "Property",
        &[
            "Real Estate CRM",
            "Virtual Property Tours",
            "Lease Management",
            "Real Estate Analytics",
            "Property Investment Tools",
        ],
    ),
    (
        "Education",
        &[
            "Learning Management System",
            "Virtual Classroom",
            "Corporate Training",
            "Student Information System",
            "Online Proctoring",
            "E-book Delivery",
        ],
    ),
    (
        "Learning",
        &[
            "AI Personalized Learning",
            "Gamified Language Learning",
            "AI Course Creation",
            "Spaced Repetition",
            "Educational Content",
            "Skill Development",
        ],
    ),
    (
        "Legal",
        &[
            "Contract Generator",
            "AI Legal Advisor",
            "Legal Compliance",
            "Document Management",
            "Legal Research",
        ],
    ),
    (
        "Compliance",
        &[
            "Regulatory Compliance",
            "Health Protocol Compliance",
            "Data Privacy",
            "Risk Management",
            "Audit Management",
        ],
    ),
    (
        "AI",
        &[
            "AI Content Creation",
            "AI Targeted Marketing",
            "AI Project Management",
            "AI Voice Analytics",
            "AI Image Analysis",
            "AI Contract Analysis",
        ],
    ),
    (
        "Technology",
        &[
            "No-Code Tools",
            "API Management",
            "Data Processing",
            "Machine Learning",
            "Automation Tools",
            "Integration Platforms",
        ],
    ),
    (
        "Services",
        &[
            "Subscription Cancellation",
            "Blog Analysis",
            "Meal Planning",
            "Eco-Friendly Business",
            "Job Board Platform",
            "Crowdfunding Management",
        ],
    ),
    (
        "Privacy",
        &[
            "Privacy-Centric Email",
            "Secure Communication",
            "Data Protection",
            "Encryption Services",
            "Privacy Analytics",
        ],
    ),
];

const DEFAULT_MISSING_PIECES: &[(&str, &str)] = &[
    ("AI-powered", "Leverage artificial intelligence for automation and insights"),
    ("Machine Learning", "Advanced ML algorithms for predictive analytics"),
    ("Automated", "Fully automated processes with minimal human intervention"),
    ("Real-time", "Live data processing and instant updates"),
    ("API-first", "Built with comprehensive API access and integrations"),
    ("Mobile-first", "Optimized primarily for mobile devices and workflows"),
    ("User-friendly", "Intuitive interface requiring minimal training"),
    ("Accessible", "Designed for users with disabilities and diverse needs"),
    ("Gamified", "Game mechanics to increase engagement and retention"),
    ("Cost-effective", "Affordable pricing for small to medium businesses"),
    ("Freemium", "Free tier with premium features for advanced users"),
    ("Subscription-based", "Recurring revenue model with predictable pricing"),
    ("Pay-per-use", "Usage-based pricing for flexible scaling"),
    ("Integration-focused", "Seamless connectivity with popular business tools"),
    ("White-label", "Customizable branding for resellers and partners"),
    ("Multi-platform", "Works across multiple platforms and devices"),
    ("Cloud-native", "Built specifically for cloud infrastructure"),
    ("Privacy-focused", "Enhanced data protection and compliance features"),
    ("Secure", "Enterprise-grade security and encryption"),
    ("Compliant", "Built-in compliance with industry regulations"),
    ("Audit-ready", "Comprehensive logging and audit trails"),
    ("Scalable", "Designed to grow with business needs"),
    ("High-performance", "Optimized for speed and efficiency"),
    ("Enterprise-ready", "Built for large-scale enterprise deployment"),
    ("Global", "Designed for international markets and compliance"),
    ("Blockchain-powered", "Leveraging blockchain technology for transparency"),
    ("IoT-enabled", "Integration with Internet of Things devices"),
    ("Voice-activated", "Voice commands and natural language processing"),
    ("Predictive", "Advanced analytics and forecasting capabilities"),
    ("Edge-computing", "Distributed computing at the network edge"),
    ("Quantum-ready", "Prepared for quantum computing integration"),
    ("Neural-network", "Deep learning and neural network architectures"),
    ("Federated", "Distributed data processing without centralization"),
    ("Self-healing", "Automated error detection and recovery systems"),
    ("Zero-trust", "Security model with continuous verification"),
];

const DEFAULT_DOMAIN_CATEGORIES: &[(&str, &[&str])] = &[
    ("Business Operations", &["CRM", "ERP", "Business Automation"]),
    ("Marketing & Sales", &["Marketing", "Analytics", "Sales"]),
    ("E-commerce & Retail", &["E-commerce", "Retail"]),
    ("Finance & Accounting", &["Finance", "Accounting", "FinTech"]),
    ("Health & Wellness", &["Health", "Wellness", "Fitness"]),
    ("Productivity & Collaboration", &["Productivity", "Communication", "Remote Work"]),
    ("Real Estate", &["Real Estate", "Property"]),
    ("Education", &["Education", "Learning"]),
    ("Legal & Compliance", &["Legal", "Compliance"]),
    ("Technology & AI", &["AI", "Technology"]),
    ("Specialized Services", &["Services", "Privacy"]),
];
