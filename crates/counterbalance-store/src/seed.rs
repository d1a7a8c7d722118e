//! Sample corpus used when a fresh database has no reference data.
//!
//! Three queries with nine candidate documents each, matching the 9×9
//! default square. Some candidates are deliberately off-topic distractors.

use counterbalance_core::{Document, Query};

const QUERIES: &[(i64, &str)] = &[
    (1, "Climate Change Impacts on Agriculture"),
    (2, "What are the benefits of regular exercise?"),
    (3, "What are the causes of inflation?"),
];

/// `(id, query_id, display_no, content)`
const DOCUMENTS: &[(i64, i64, i64, &str)] = &[
    (
        1,
        1,
        11,
        "Higher average temperatures can speed up crop growth cycles, sometimes reducing yields and affecting crop quality.",
    ),
    (
        2,
        1,
        12,
        "More frequent droughts, floods, and heatwaves threaten harvests and raise economic risks for farmers worldwide.",
    ),
    (
        3,
        1,
        13,
        "Warmer climates allow pests and pathogens to expand their range, putting additional stress on crops and yields.",
    ),
    (
        4,
        1,
        14,
        "Changes in rainfall patterns and competition for water resources make irrigation more challenging, particularly in arid regions.",
    ),
    (
        5,
        1,
        15,
        "Fluctuating rain intensity and prolonged droughts erode topsoil and reduce soil fertility, requiring careful land management.",
    ),
    (
        6,
        1,
        16,
        "As growing conditions change, farmers may need to adopt heat- or drought-tolerant crops or move to new planting zones.",
    ),
    (
        7,
        1,
        17,
        "Extreme heat affects animal health, feed availability, and grazing land productivity, raising costs for livestock producers.",
    ),
    (
        8,
        1,
        18,
        "Unpredictable harvests can drive up food prices and jeopardize global food supplies, hitting vulnerable populations the hardest.",
    ),
    (
        9,
        1,
        19,
        "Techniques like organic farming, precision irrigation, and conservation tillage help enhance resilience against climate impacts.",
    ),
    (
        10,
        2,
        21,
        "Regular exercise improves cardiovascular health, strengthens muscles, and boosts mental well-being. Studies show that engaging in at least 150 minutes of moderate-intensity exercise per week reduces the risk of chronic diseases like diabetes and hypertension.",
    ),
    (
        11,
        2,
        22,
        "Exercise plays a crucial role in maintaining a healthy weight and enhancing brain function. Physical activity has been linked to improved memory, reduced stress, and a lower likelihood of developing conditions such as depression and anxiety.",
    ),
    (
        12,
        2,
        23,
        "A balanced diet and good sleep are also key factors in maintaining overall health. While exercise is beneficial, it should be combined with proper nutrition and adequate rest for the best results.",
    ),
    (
        13,
        2,
        24,
        "Walking daily can be a simple yet effective form of exercise. Even short walks can improve circulation, aid digestion, and contribute to weight management.",
    ),
    (
        14,
        2,
        25,
        "Many people find it challenging to stick to an exercise routine due to time constraints and lack of motivation. However, setting small, achievable goals and finding an enjoyable activity can make it easier to maintain a consistent habit.",
    ),
    (
        15,
        2,
        26,
        "The human body requires essential nutrients such as vitamins, proteins, and minerals to function properly. While food plays a major role in health, physical activity can complement its benefits.",
    ),
    (
        16,
        2,
        27,
        "Some people prefer indoor workouts like yoga or Pilates, while others enjoy outdoor activities such as hiking or running. The choice of exercise largely depends on personal preference and fitness goals.",
    ),
    (
        17,
        2,
        28,
        "Technological advancements in smartwatches and fitness trackers have made it easier for people to monitor their health and activity levels, encouraging them to stay active.",
    ),
    (
        18,
        2,
        29,
        "Traveling to different countries can provide opportunities to experience new cultures, try different foods, and explore diverse landscapes.",
    ),
    (
        19,
        3,
        31,
        "Inflation is primarily caused by an increase in the money supply, rising production costs, and high consumer demand. When too much money circulates in the economy without a corresponding rise in goods and services, prices go up.",
    ),
    (
        20,
        3,
        32,
        "Cost-push inflation occurs when the costs of raw materials, wages, and production increase, leading businesses to raise prices to maintain profitability. This is often triggered by supply chain disruptions or rising oil prices.",
    ),
    (
        21,
        3,
        33,
        "Demand-pull inflation happens when consumer demand for goods and services exceeds supply. This can be driven by economic growth, low unemployment, or government stimulus measures that increase spending.",
    ),
    (
        22,
        3,
        34,
        "Central banks control inflation by adjusting interest rates. When inflation is high, they raise interest rates to slow down borrowing and spending, helping to stabilize prices.",
    ),
    (
        23,
        3,
        35,
        "Exchange rate fluctuations can influence inflation. A weaker currency makes imported goods more expensive, raising overall prices in the economy.",
    ),
    (
        24,
        3,
        36,
        "Stock market trends can indirectly affect inflation, as investor confidence and asset prices influence spending behaviors, but stock prices themselves do not directly cause inflation.",
    ),
    (
        25,
        3,
        37,
        "Technological advancements can help reduce inflation by improving production efficiency and lowering costs, but their impact varies across industries.",
    ),
    (
        26,
        3,
        38,
        "Space exploration budgets have increased in recent years, with countries investing in new missions to explore Mars and the Moon.",
    ),
    (
        27,
        3,
        39,
        "Many people adopt plant-based diets for health and environmental reasons, leading to increased demand for alternative protein sources such as tofu and plant-based meat.",
    ),
];

pub fn sample_queries() -> Vec<Query> {
    QUERIES
        .iter()
        .map(|&(id, content)| Query {
            id,
            content: content.to_string(),
        })
        .collect()
}

pub fn sample_documents() -> Vec<Document> {
    DOCUMENTS
        .iter()
        .map(|&(id, query_id, display_no, content)| Document {
            id,
            query_id,
            display_no,
            content: content.to_string(),
        })
        .collect()
}
