use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{excerpt, timestamp_now, AgentStep, AiResult};
use crate::prompts::{ExpertCatalog, ExpertKind, ExpertProfile};

/** \brief 预设文本中回显的查询长度（字符）。 */
pub const QUERY_ECHO_CHARS: usize = 80;
/** \brief 每个步骤结果摘要的长度。 */
pub const SNIPPET_CHARS: usize = 150;

pub const DEMO_PROVIDER: &str = "Demo Mode";
pub const DEMO_RESEARCH_PROVIDER: &str = "Demo Mode (LLMs not available)";
pub const DEMO_MODEL: &str = "demo-model";
pub const EMERGENCY_PROVIDER: &str = "Emergency Demo Mode";
pub const EMERGENCY_MODEL: &str = "emergency-demo";

const SINGLE_CONFIDENCE: f32 = 0.9;
const MULTI_CONFIDENCE: f32 = 0.85;
const EMERGENCY_CONFIDENCE: f32 = 0.7;
const MULTI_TOKENS: u64 = 450;
const EMERGENCY_TOKENS: u64 = 250;

/**
 * \brief 单代理（`/chat`）或三步（`/research/assistant`）输出。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    Single,
    Multi,
}

/**
 * \brief 生成的单个步骤，尚未转成展示记录。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoStep {
    pub agent: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct DemoOutput {
    pub steps: Vec<DemoStep>,
    /** \brief 汇总结果，文本取最后一步。 */
    pub result: AiResult,
}

/**
 * \brief 实时路径不可用时使用的预设回复生成器。
 */
#[derive(Debug, Clone, Default)]
pub struct DemoGenerator {
    experts: ExpertCatalog,
}

impl DemoGenerator {
    pub fn new(experts: ExpertCatalog) -> Self {
        Self { experts }
    }

    pub fn generate(&self, expert_key: &str, query: &str, mode: AgentMode) -> DemoOutput {
        self.generate_with(&mut rand::thread_rng(), expert_key, query, mode)
    }

    /**
     * \brief 同 `generate`，但从给定 rng 抽取变体。
     */
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        expert_key: &str,
        query: &str,
        mode: AgentMode,
    ) -> DemoOutput {
        let kind = ExpertKind::from_key(expert_key);
        let echo = excerpt(query, QUERY_ECHO_CHARS);
        match mode {
            AgentMode::Single => {
                let bank = single_bank(kind);
                let template = bank.choose(rng).copied().unwrap_or(GENERIC_SINGLE);
                let text = render(template, echo);
                let mut result = AiResult::success(DEMO_PROVIDER, text.clone(), DEMO_MODEL, None);
                result.confidence = SINGLE_CONFIDENCE;
                result.demo_mode = true;
                DemoOutput {
                    steps: vec![DemoStep {
                        agent: "Analyst".to_string(),
                        text,
                    }],
                    result,
                }
            }
            AgentMode::Multi => {
                let variants = multi_bank(kind.unwrap_or(ExpertKind::MultiDomain));
                let chosen = variants.choose(rng).copied().unwrap_or(MULTI_DOMAIN[0]);
                let steps: Vec<DemoStep> = chosen
                    .iter()
                    .map(|(agent, template)| DemoStep {
                        agent: agent.to_string(),
                        text: render(template, echo),
                    })
                    .collect();
                let profile = self.experts.prompt_for(expert_key);
                let final_text = steps.last().map(|s| s.text.clone()).unwrap_or_default();
                let mut result = AiResult::success(
                    DEMO_RESEARCH_PROVIDER,
                    final_text,
                    DEMO_MODEL,
                    Some(MULTI_TOKENS),
                );
                result.confidence = MULTI_CONFIDENCE;
                result.demo_mode = true;
                result.agent_steps = relabel_steps(
                    profile,
                    steps.iter().map(|s| (s.agent.as_str(), s.text.as_str())),
                );
                DemoOutput { steps, result }
            }
        }
    }
}

/**
 * \brief 处理器出错时的兜底回复。
 */
pub fn emergency(query: &str) -> AiResult {
    let question = if query.trim().is_empty() {
        "Not specified"
    } else {
        excerpt(query, 100)
    };
    let text = format!(
        "📊 **DEMONSTRATION RESPONSE**\n\nSystem is running in demonstration mode.\n\n\
         **Question:** {}\n\n\
         **Key recommendations:**\n1. Start with pilot study\n2. Test multiple approaches\n3. Collect feedback\n\n\
         **Next steps:**\n• Configure API keys for real analysis\n• Study documentation\n• Test different expert systems",
        question
    );
    let mut result = AiResult::success(EMERGENCY_PROVIDER, text, EMERGENCY_MODEL, Some(EMERGENCY_TOKENS));
    result.confidence = EMERGENCY_CONFIDENCE;
    result.emergency_mode = true;
    result.agent_steps = vec![AgentStep {
        agent: "Emergency Handler".to_string(),
        action: "Generating demo response".to_string(),
        result: "Created basic demonstration response".to_string(),
        timestamp: timestamp_now(),
    }];
    result
}

/**
 * \brief 把 `(agent, text)` 转成展示步骤，action 取 `profile` 中对应代理的角色。
 */
pub fn relabel_steps<'a>(
    profile: &ExpertProfile,
    steps: impl Iterator<Item = (&'a str, &'a str)>,
) -> Vec<AgentStep> {
    steps
        .enumerate()
        .map(|(i, (agent, text))| AgentStep {
            agent: agent.to_string(),
            action: profile
                .agents
                .get(i)
                .map(|a| a.role)
                .unwrap_or("Analysis")
                .to_string(),
            result: format!("{}...", excerpt(text, SNIPPET_CHARS)),
            timestamp: timestamp_now(),
        })
        .collect()
}

fn render(template: &str, echo: &str) -> String {
    template.replace("{query}", echo)
}

type StepTemplate = (&'static str, &'static str);

const GENERIC_SINGLE: &str = "🤖 **AI Analysis**: The system has processed your request \"{query}...\". \
In demo mode, typical results of the expert system operation are presented.";

fn single_bank(kind: Option<ExpertKind>) -> &'static [&'static str] {
    match kind {
        Some(ExpertKind::GenerativeAi) => &GENERATIVE_AI_SINGLE,
        Some(ExpertKind::KnowledgeGraph) => &KNOWLEDGE_GRAPH_SINGLE,
        Some(ExpertKind::LifeSciences) => &LIFE_SCIENCES_SINGLE,
        Some(ExpertKind::MultiDomain) => &MULTI_DOMAIN_SINGLE,
        None => &[GENERIC_SINGLE],
    }
}

fn multi_bank(kind: ExpertKind) -> &'static [[StepTemplate; 3]] {
    match kind {
        ExpertKind::MultiDomain => &MULTI_DOMAIN,
        ExpertKind::GenerativeAi => &GENERATIVE_AI,
        ExpertKind::KnowledgeGraph => &KNOWLEDGE_GRAPH,
        ExpertKind::LifeSciences => &LIFE_SCIENCES,
    }
}

const GENERATIVE_AI_SINGLE: [&str; 2] = [
    "🎯 **Request Analysis**: Your query \"{query}...\" relates to generative AI capabilities. \n\n\
✨ **Creative Ideas**: 1. Using diffusion models for generating scientific hypotheses. 2. Applying GPT architectures for automating literature review. \n\n\
🚀 **Innovative Approaches**: Combining transformers with generative adversarial networks for creating new research patterns.",
    "💡 **Generative Analysis**: Based on your query \"{query}...\", I propose synthesizing interdisciplinary approaches using: \n\
1. Variational autoencoders for feature compression\n\
2. Transformer architectures for generating text reports\n\
3. Diffusion models for visualizing research data",
];

const KNOWLEDGE_GRAPH_SINGLE: [&str; 2] = [
    "🕸️ **Semantic Analysis**: Key connections between the concepts in \"{query}...\" have been identified. \n\n\
🔗 **Main Patterns**: 1. Strong correlation between concepts X and Y. 2. Hidden dependencies in data structure discovered. \n\n\
📊 **Visualization**: Recommend building a knowledge graph with cluster highlighting by thematic proximity.",
    "🌐 **Relationship Analysis**: Network analysis of \"{query}...\" shows three main clusters of interconnections. \n\n\
🎯 **Key Nodes**: Central concepts requiring additional study have been identified. \n\n\
🔍 **Recommendations**: Use graph neural networks for predicting new connections.",
];

const LIFE_SCIENCES_SINGLE: [&str; 2] = [
    "🧬 **Biomedical Analysis**: Based on your query \"{query}...\", I recommend the following methods: \n\n\
🔬 **Experimental Approaches**: 1. CRISPR-Cas9 for gene editing. 2. Single-cell RNA sequencing for analyzing cellular heterogeneity. \n\n\
📈 **Statistical Methods**: Applying Bayesian inference for analyzing biological data.",
    "🔍 **Scientific Analysis**: In the context of your query \"{query}...\", consider: \n\
1. Proteomic analysis using mass spectrometry\n\
2. Protein structure modeling with AlphaFold\n\
3. Metagenomic data analysis for studying microbiome",
];

const MULTI_DOMAIN_SINGLE: [&str; 2] = [
    "🌐 **Interdisciplinary Analysis**: Integrating approaches from different fields for \"{query}...\". \n\n\
🎯 **Method Synthesis**: 1. Combining ML algorithms with traditional statistical methods. 2. Using network analysis to identify cross-domain dependencies. \n\n\
🚀 **Comprehensive Approach**: Propose a framework combining data analysis, visualization, and prediction.",
    "⚡ **Integrative Analysis**: Synthesizing approaches from computer science, biology, and cognitive sciences for \"{query}...\". \n\n\
🔗 **Interdisciplinary Connections**: Promising directions at the intersection of AI technologies and biomedical research have been identified.",
];

const MULTI_DOMAIN: [[StepTemplate; 3]; 1] = [[
    (
        "Multi-Expert Analyzer",
        "🔍 **INTERDISCIPLINARY ANALYSIS**\n\nQuestion: \"{query}...\"\n\n\
**1. Generative AI/ML:**\n• Transformer architectures for text analysis\n• Generative models for hypothesis creation\n• RL for research process optimization\n\n\
**2. Biomedicine:**\n• CRISPR-Cas systems for genetic research\n• Clinical protocols for validation\n• Omics technologies for data analysis\n\n\
**Conclusion:** Integration of computational and experimental approaches is required.",
    ),
    (
        "System Critic-Verifier",
        "🛡️ **ANALYSIS VERIFICATION**\n\nReviewed: \"{query}...\"\n\n\
**Check completed:**\n✓ Methodological correctness: high level\n✓ Practical feasibility: medium (requires resources)\n✓ Scientific novelty: present\n\n\
**Recommendations:**\n1. Start with pilot study\n2. Consider ethical aspects\n3. Develop phased implementation plan\n\n\
**Risks:** Computational complexity, equipment cost.",
    ),
    (
        "Integrator and Editor",
        "📋 **INTEGRATED ACTION PLAN**\n\nTopic: \"{query}...\"\n\n\
## 🔬 Analysis Summary\nInterdisciplinary approach shows high potential for solving the given task.\n\n\
## 🎯 Recommended Steps\n1. **Stage 1 (1-3 months):** Prototyping and proof-of-concept\n2. **Stage 2 (3-6 months):** Validation on test data\n3. **Stage 3 (6-12 months):** Clinical/experimental trials\n\n\
## 📊 Key Metrics\n• Accuracy: >85%\n• Reproducibility: >90%\n• Execution time: <24 hours\n\n\
## 🤝 Potential Collaborations\n• Computational centers\n• Biomedical laboratories\n• Scientific institutes\n\n\
## 💡 Further Research\nExplore application of quantum computing to accelerate analysis.",
    ),
]];

const GENERATIVE_AI: [[StepTemplate; 3]; 1] = [[
    (
        "Idea Generator",
        "💡 **INNOVATIVE IDEAS**\n\nFor \"{query}...\"\n\n\
**Creative applications:**\n1. 🌟 Using GAN for molecular structure generation\n2. 🧠 Transformers for scientific article analysis\n3. 🎨 Diffusion models for protein design\n4. 🤖 RL for research process optimization\n5. 👁️ Multimodal models for image and text analysis\n\n\
**Innovative approaches:**\n• Neuro-symbolic AI\n• Federated learning\n• Meta-learning for rapid adaptation",
    ),
    (
        "Feasibility Analyst",
        "📊 **FEASIBILITY ANALYSIS**\n\nFor \"{query}...\"\n\n\
**Evaluation of proposed ideas:**\n✓ Ideas 1-3: Technically feasible, require GPU clusters\n✓ Idea 4: Requires additional research\n✓ Idea 5: High potential but complex implementation\n\n\
**Resource requirements:**\n• Computational: 8+ GPUs\n• Data: 1TB+ labeled data\n• Time: 6-12 months\n\n\
**Alternatives:**\n• Use of cloud services\n• Collaborations with AI laboratories",
    ),
    (
        "Structurer-Visionary",
        "🚀 **IMPLEMENTATION ROADMAP**\n\nVision for \"{query}...\"\n\n\
## 📅 Timeline\n**Quarter 1:** Prototyping and MVP\n**Quarters 2-3:** Validation and optimization\n**Quarter 4:** Pilot implementation\n**Year 2:** Scaling\n\n\
## 🎯 Key Goals\n1. Develop working prototype in 3 months\n2. Achieve >80% accuracy on test data\n3. Attract 2+ scientific collaborations\n\n\
## 🤝 Partnership Strategy\n• Cloud providers\n• Research institutes\n• Startup incubators\n\n\
## 📈 Expected Impact\n• Research acceleration: 40%\n• Experiment cost reduction: 25%\n• New publications in top journals",
    ),
]];

const LIFE_SCIENCES: [[StepTemplate; 3]; 1] = [[
    (
        "Biomedical Expert",
        "🧬 **BIOMEDICAL ANALYSIS**\n\n**Question:** \"{query}...\"\n\n\
**Molecular biology:**\n• CRISPR-Cas9 for genome editing\n• Single-cell RNA-seq for expression analysis\n• Proteomics for protein interaction studies\n\n\
**Clinical aspects:**\n• Randomized controlled trials\n• Phase I-III clinical trials\n• Long-term patient monitoring\n\n\
**Drug Discovery:**\n• In-silico compound screening\n• ADMET predictions\n• Pharmacokinetic modeling",
    ),
    (
        "Reviewer and Validator",
        "⚖️ **SCIENTIFIC VERIFICATION**\n\n**Protocol under review:** \"{query}...\"\n\n\
**Protocol verification:**\n✓ Methodology complies with GLP/GCP\n✓ Statistical power adequate\n✓ Ethical approval required\n\n\
**Validation:**\n• Results must be reproducible in 3+ laboratories\n• Control groups necessary\n• Blind studies to minimize bias\n\n\
**Recommendations:**\n1. Approve protocol in ethics committee\n2. Register study (ClinicalTrials.gov)\n3. Plan independent verification",
    ),
    (
        "Translator-Integrator",
        "🌐 **PRACTICAL APPLICATION**\n\n**Topic:** \"{query}...\"\n\n\
## 📋 For Researchers\nDeveloped 4-stage plan with clear success criteria.\n\n\
## 🏥 For Clinicians\nSpecific protocols proposed for clinical practice implementation.\n\n\
## 💼 For Investors\n**Business potential:**\n• Payback period: 3-5 years\n• Competitive advantages: speed, accuracy\n\n\
## 🎯 Key Conclusions\n1. Technology ready for pilot trials\n2. Requires dedicated investment\n3. First results in 12-18 months\n\n\
## 🤝 Next Steps\n• Consortium creation\n• Grant application submission\n• Search for industrial partners",
    ),
]];

const KNOWLEDGE_GRAPH: [[StepTemplate; 3]; 1] = [[
    (
        "Relationship Analyzer",
        "🕸️ **SEMANTIC ANALYSIS**\n\n**Question:** \"{query}...\"\n\n\
**Concepts in question:**\n• Artificial intelligence\n• Biological systems\n• Scientific research\n• Data and information\n\n\
**Identified connections:**\n1. AI → Data analysis → Scientific discoveries\n2. Biology → Experiments → Validation\n3. Research → Publications → Application\n\n\
**Patterns:**\n• Interdisciplinarity enhances innovation\n• Cycle: hypothesis → experiment → analysis → conclusion\n• Network effect in scientific collaborations",
    ),
    (
        "Data Verifier",
        "🔍 **DATA VALIDATION**\n\n**Checked against:** \"{query}...\"\n\n\
**Confirmation sources:**\n• PubMed: 150+ relevant articles\n• arXiv: 80+ preprints\n• Patents: 20+ applications\n\n\
**Statistical significance:**\n• Correlations: p < 0.01\n• Effect size: medium to large\n• Power analysis: >80%\n\n\
**Data recommendations:**\n1. Use multiple independent sources\n2. Apply cross-validation\n3. Consider publication bias",
    ),
    (
        "Knowledge Visualizer",
        "📊 **KNOWLEDGE STRUCTURE**\n\n**Mapped topic:** \"{query}...\"\n\n\
## 🏗️ Ontology\n**Level 1 (Concepts):**\n• AI methods\n• Biological objects\n• Research processes\n\n\
**Level 2 (Connections):**\n• Analysis → Results\n• Experiments → Data\n• Hypotheses → Verification\n\n\
**Level 3 (Applications):**\n• Medicine\n• Biotechnology\n• Pharmaceuticals\n\n\
## 🎨 Visualization\nRecommended tools:\n• Neo4j for knowledge graphs\n• Gephi for network analysis\n• D3.js for interactive visualizations\n\n\
## 📈 Insights\n1. Most promising connections: AI+Biology\n2. Critical nodes: data validation\n3. Potential breakthroughs: integrative approaches",
    ),
]];
