/** \brief 未匹配到专家时使用的系统提示词。 */
pub const GENERIC_SYSTEM_PROMPT: &str =
    "You are an AI research assistant. Respond in detail and professionally.";

/**
 * \brief 已知的专家类型。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpertKind {
    MultiDomain,
    GenerativeAi,
    KnowledgeGraph,
    LifeSciences,
}

impl ExpertKind {
    pub const ALL: [ExpertKind; 4] = [
        ExpertKind::MultiDomain,
        ExpertKind::GenerativeAi,
        ExpertKind::KnowledgeGraph,
        ExpertKind::LifeSciences,
    ];

    /** \brief 规范 slug，如 `life-sciences`。 */
    pub fn slug(&self) -> &'static str {
        match self {
            ExpertKind::MultiDomain => "multi-domain",
            ExpertKind::GenerativeAi => "generative-ai",
            ExpertKind::KnowledgeGraph => "knowledge-graph",
            ExpertKind::LifeSciences => "life-sciences",
        }
    }

    /** \brief 展示名，如 `Life Sciences`。 */
    pub fn label(&self) -> &'static str {
        match self {
            ExpertKind::MultiDomain => "Multi-Domain",
            ExpertKind::GenerativeAi => "Generative AI",
            ExpertKind::KnowledgeGraph => "Knowledge Graph",
            ExpertKind::LifeSciences => "Life Sciences",
        }
    }

    /**
     * \brief slug 或展示名均可，不区分大小写。
     */
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '_' => '-',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL.into_iter().find(|k| k.slug() == normalized)
    }
}

/**
 * \brief 模拟多代理流水线中的一个阶段。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPrompt {
    pub name: &'static str,
    pub role: &'static str,
    pub prompt: &'static str,
}

/**
 * \brief 专家画像：单代理系统提示词加三代理序列。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertProfile {
    /** \brief 通用兜底画像为 None。 */
    pub kind: Option<ExpertKind>,
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub agents: Vec<AgentPrompt>,
}

impl ExpertProfile {
    pub fn key(&self) -> &'static str {
        self.kind.map(|k| k.slug()).unwrap_or("generic")
    }

    pub fn is_fallback(&self) -> bool {
        self.kind.is_none()
    }
}

/**
 * \brief 专家画像表，只读。
 */
#[derive(Debug, Clone)]
pub struct ExpertCatalog {
    profiles: Vec<ExpertProfile>,
    generic: ExpertProfile,
}

impl Default for ExpertCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExpertCatalog {
    pub fn builtin() -> Self {
        let profiles = ExpertKind::ALL.into_iter().map(builtin_profile).collect();
        let generic = ExpertProfile {
            kind: None,
            name: "AI Research Assistant",
            system_prompt: GENERIC_SYSTEM_PROMPT,
            agents: multi_domain_agents(),
        };
        Self { profiles, generic }
    }

    /**
     * \brief 按 key 查画像，未知 key 返回通用画像。
     */
    pub fn prompt_for(&self, expert_key: &str) -> &ExpertProfile {
        self.resolve(expert_key).unwrap_or(&self.generic)
    }

    /**
     * \brief 严格查找，供拒绝未知专家的调用方使用。
     */
    pub fn resolve(&self, expert_key: &str) -> Option<&ExpertProfile> {
        let kind = ExpertKind::from_key(expert_key)?;
        self.profiles.iter().find(|p| p.kind == Some(kind))
    }

    pub fn slugs(&self) -> Vec<&'static str> {
        self.profiles.iter().map(|p| p.key()).collect()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.profiles
            .iter()
            .filter_map(|p| p.kind.map(|k| k.label()))
            .collect()
    }
}

fn builtin_profile(kind: ExpertKind) -> ExpertProfile {
    match kind {
        ExpertKind::MultiDomain => ExpertProfile {
            kind: Some(kind),
            name: "Multi-Domain Expert System",
            system_prompt: GENERIC_SYSTEM_PROMPT,
            agents: multi_domain_agents(),
        },
        ExpertKind::GenerativeAi => ExpertProfile {
            kind: Some(kind),
            name: "Generative AI Creative System",
            system_prompt: "You are an expert in generative AI and creative research. \
                Respond creatively, offer new ideas and approaches. \
                Be specific and propose practical solutions.",
            agents: vec![
                AgentPrompt {
                    name: "Idea Generator",
                    role: "Generation of creative ideas and innovative approaches",
                    prompt: "You are a creative idea generator in the field of Generative AI.\n\n\
                        Generate innovative ideas and approaches to solve the given question.\n\
                        Focus on:\n\
                        1. Creative applications of generative models\n\
                        2. Innovative architectures and approaches\n\
                        3. Interdisciplinary opportunities\n\
                        4. Future trends and directions\n\n\
                        Be bold and original in your suggestions.",
                },
                AgentPrompt {
                    name: "Feasibility Analyst",
                    role: "Analysis of practical feasibility of proposed ideas",
                    prompt: "You are a practical feasibility analyst.\n\n\
                        Analyze proposed ideas for:\n\
                        1. Technical feasibility\n\
                        2. Resource requirements\n\
                        3. Potential risks and limitations\n\
                        4. Alternative approaches\n\n\
                        Be critical but constructive.",
                },
                AgentPrompt {
                    name: "Structurer-Visionary",
                    role: "Structuring and formatting the final vision",
                    prompt: "You are a visionary and structurer.\n\n\
                        Transform analysis into a clear, structured plan:\n\
                        1. Implementation stages\n\
                        2. Key success metrics\n\
                        3. Potential partners and collaborations\n\
                        4. Roadmap for the next 1-3 years\n\n\
                        Make the response inspiring and practical simultaneously.",
                },
            ],
        },
        ExpertKind::KnowledgeGraph => ExpertProfile {
            kind: Some(kind),
            name: "Knowledge Graph Analysis System",
            system_prompt: "You are an expert in semantic networks and relationship analysis. \
                Analyze connections and patterns. \
                Explain complex concepts in simple language.",
            agents: vec![
                AgentPrompt {
                    name: "Relationship Analyzer",
                    role: "Identifying semantic connections and patterns",
                    prompt: "You are an expert in semantic networks and knowledge graphs.\n\n\
                        Analyze the question from the perspective of:\n\
                        1. Semantic connections and dependencies\n\
                        2. Patterns in data and information\n\
                        3. Network analysis approaches\n\
                        4. Knowledge extraction methods\n\n\
                        Use concepts from graph theory and semantic analysis.",
                },
                AgentPrompt {
                    name: "Data Verifier",
                    role: "Verifying accuracy and relevance of identified connections",
                    prompt: "You are a data and connections verifier.\n\n\
                        Check identified connections for:\n\
                        1. Factual accuracy\n\
                        2. Statistical significance\n\
                        3. Relevance of sources\n\
                        4. Potential cognitive biases\n\n\
                        Suggest validation and verification methods.",
                },
                AgentPrompt {
                    name: "Knowledge Visualizer",
                    role: "Structuring knowledge into understandable format",
                    prompt: "You are a knowledge visualizer and structurer.\n\n\
                        Present analysis in the form of:\n\
                        1. Structured ontology\n\
                        2. Hierarchy of concepts\n\
                        3. Visual connection diagram\n\
                        4. Recommendations for further analysis\n\n\
                        Use metaphors and analogies for complex concepts.",
                },
            ],
        },
        ExpertKind::LifeSciences => ExpertProfile {
            kind: Some(kind),
            name: "Life Sciences Expert System",
            system_prompt: "You are an expert in biomedical research and life sciences. \
                Focus on scientific accuracy. Propose specific methods and approaches.",
            agents: vec![
                AgentPrompt {
                    name: "Biomedical Expert",
                    role: "Scientific analysis from biomedical perspective",
                    prompt: "You are a leading expert in biomedical research.\n\n\
                        Analyze the question from the position of:\n\
                        1. Molecular biology and genetics\n\
                        2. Clinical research and medicine\n\
                        3. Bioinformatics and omics technologies\n\
                        4. Pharmacology and drug discovery\n\n\
                        Rely on current research and meta-analyses.",
                },
                AgentPrompt {
                    name: "Reviewer and Validator",
                    role: "Verifying scientific correctness and reproducibility",
                    prompt: "You are a scientific reviewer and validator.\n\n\
                        Check previous analysis for:\n\
                        1. Methodological correctness\n\
                        2. Reproducibility of results\n\
                        3. Ethical permissibility\n\
                        4. Compliance with GCP/GLP/GMP standards\n\n\
                        Suggest improvements to research protocols.",
                },
                AgentPrompt {
                    name: "Translator-Integrator",
                    role: "Adapting complex concepts for interdisciplinary audience",
                    prompt: "You are a translator of scientific concepts.\n\n\
                        Adapt analysis for a broad audience:\n\
                        1. Explain complex concepts in simple terms\n\
                        2. Suggest analogies and metaphors\n\
                        3. Highlight practical significance\n\
                        4. Indicate potential applications\n\n\
                        Make the response understandable for non-specialists.",
                },
            ],
        },
    }
}

fn multi_domain_agents() -> Vec<AgentPrompt> {
    vec![
        AgentPrompt {
            name: "Multi-Expert Analyzer",
            role: "Primary analysis from interdisciplinary perspective",
            prompt: "You are a leading scientific expert with interdisciplinary expertise.\n\n\
                Analyze the following research question from the perspective of:\n\
                1. Generative AI and machine learning\n\
                2. Life sciences and biomedicine\n\
                3. Scientific research methodology\n\
                4. Semantic analysis and knowledge graphs\n\n\
                Provide deep, structured analysis. Suggest specific methods and approaches.",
        },
        AgentPrompt {
            name: "System Critic-Verifier",
            role: "Checking integrity and systematicity of analysis",
            prompt: "You are a system critic and verifier of scientific analysis.\n\n\
                Check the previous analysis for:\n\
                1. Scientific correctness and accuracy\n\
                2. Logical integrity\n\
                3. Practical feasibility\n\
                4. Potential limitations and risks\n\n\
                Suggest improvements and point out weaknesses.",
        },
        AgentPrompt {
            name: "Integrator and Editor",
            role: "Combining insights into a single structured response",
            prompt: "You are an editor and integrator of scientific content.\n\n\
                Combine previous analyses into a single, well-structured response:\n\
                1. Use markdown for formatting\n\
                2. Highlight key conclusions\n\
                3. Suggest specific steps for further actions\n\
                4. Indicate potential areas for further research\n\n\
                Make the response professional but accessible.",
        },
    ]
}
