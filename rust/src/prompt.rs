use crate::RECENT_IDEAS_LIMIT;

/// Builds the generation prompt. Only the first `RECENT_IDEAS_LIMIT` recent
/// texts are listed as patterns to avoid.
pub fn build_prompt(
    domain: &str,
    subdomain: &str,
    missing_piece: &str,
    recent_texts: &[String],
) -> String {
    let avoid = recent_texts
        .iter()
        .take(RECENT_IDEAS_LIMIT)
        .map(|text| format!("- {text}"))
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        r#"
You are an expert SaaS innovation strategist creating breakthrough software solutions. Generate a cutting-edge SaaS business idea with these specifications:

CORE REQUIREMENTS:
- Main Domain: {domain}
- Subdomain: {subdomain}
- Innovation Angle: {missing_piece}
- Format: EXACTLY ONE LINE (no line breaks, no bullet points, no formatting)
- Structure: Problem -> Solution -> Market -> Differentiation (all in one sentence)
- Tags: ({domain}) ({subdomain})

INNOVATION GUIDELINES:
- Focus on SOFTWARE-ONLY solutions (no physical products)
- Leverage emerging technologies: AI/ML, blockchain, IoT, edge computing, quantum computing
- Target underserved markets or create new market categories
- Emphasize automation, intelligence, and scalability
- Consider modern tech stacks: microservices, serverless, real-time processing
- Think about API-first, headless, and composable architectures

IDEA GENERATION FRAMEWORK:
Create ONE SINGLE SENTENCE that covers:
1. PROBLEM: Identify a specific, painful problem in {subdomain}
2. SOLUTION: Describe a software platform that solves this with {missing_piece} approach
3. MARKET: Define the target market size and specific customer segments
4. DIFFERENTIATION: Explain unique technical advantages and competitive moats

TECHNICAL FOCUS AREAS:
- AI/ML: Predictive analytics, natural language processing, computer vision, recommendation engines
- Real-time: Live data processing, instant collaboration, real-time analytics
- Automation: Workflow automation, intelligent routing, self-healing systems
- Integration: API ecosystems, webhook systems, data synchronization
- Security: Zero-trust architecture, encryption, compliance automation
- Scalability: Cloud-native, microservices, auto-scaling, global distribution

AVOID THESE COMMON PATTERNS:
{avoid}

CREATIVITY REQUIREMENTS:
- Think like a startup founder solving billion-dollar problems
- Consider B2B SaaS with recurring revenue models
- Focus on software that can scale globally
- Emphasize technical innovation over business model innovation
- Create ideas that would excite VCs and technical teams

CRITICAL: Generate EXACTLY ONE LINE with no line breaks, bullet points, or special formatting. The response must be a single, flowing sentence that covers all four elements (problem, solution, market, differentiation).

Generate a completely unique, technically innovative SaaS idea that pushes the boundaries of what's possible in {subdomain}.
"#
    )
}
